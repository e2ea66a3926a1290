//! Pointer gesture recognition: tap, one-pointer orbit, two-pointer pinch/pan.

use std::collections::BTreeMap;

use glam::Vec2;
use shared::PointerEvent;

/// Camera motion or selection request derived from pointer input
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    /// Single-pointer drag, in pixels
    Orbit { dx: f32, dy: f32 },
    /// Two-pointer motion: change of inter-pointer distance and midpoint motion
    PinchPan { pinch: f32, pan: Vec2 },
    /// Wheel zoom, in wheel units
    Zoom { delta: f32 },
    /// Released without travelling past the slop and with no second pointer
    Tap { position: Vec2 },
}

#[derive(Clone, Copy, Debug)]
struct Pointer {
    start: Vec2,
    last: Vec2,
}

#[derive(Debug)]
pub struct GestureTracker {
    pointers: BTreeMap<u64, Pointer>,
    slop: f32,
    /// A second pointer joined the current gesture
    multi: bool,
    /// The single pointer travelled past the slop
    dragging: bool,
}

impl GestureTracker {
    pub fn new(slop: f32) -> Self {
        Self {
            pointers: BTreeMap::new(),
            slop,
            multi: false,
            dragging: false,
        }
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn handle(&mut self, event: PointerEvent) -> Option<Gesture> {
        match event {
            PointerEvent::Down { id, x, y } => {
                let pos = Vec2::new(x, y);
                self.pointers.insert(id, Pointer { start: pos, last: pos });
                if self.pointers.len() > 1 {
                    self.multi = true;
                }
                None
            }
            PointerEvent::Move { id, x, y } => self.moved(id, Vec2::new(x, y)),
            PointerEvent::Up { id, x, y } => {
                let pointer = self.pointers.remove(&id)?;
                let pos = Vec2::new(x, y);
                let tap = !self.multi
                    && !self.dragging
                    && self.pointers.is_empty()
                    && pos.distance(pointer.start) < self.slop;
                if self.pointers.is_empty() {
                    self.reset();
                }
                tap.then_some(Gesture::Tap { position: pos })
            }
            PointerEvent::Cancel { id } => {
                self.pointers.remove(&id);
                if self.pointers.is_empty() {
                    self.reset();
                }
                None
            }
            PointerEvent::Wheel { delta } => Some(Gesture::Zoom { delta }),
        }
    }

    fn moved(&mut self, id: u64, pos: Vec2) -> Option<Gesture> {
        if !self.pointers.contains_key(&id) {
            return None;
        }

        if self.pointers.len() >= 2 {
            let before = self.pair()?;
            self.pointers.get_mut(&id)?.last = pos;
            let after = self.pair()?;
            return Some(Gesture::PinchPan {
                pinch: after.0.distance(after.1) - before.0.distance(before.1),
                pan: (after.0 + after.1) * 0.5 - (before.0 + before.1) * 0.5,
            });
        }

        if self.multi {
            // Remaining finger of a finished pinch; ignore until all lift
            self.pointers.get_mut(&id)?.last = pos;
            return None;
        }

        let pointer = self.pointers.get_mut(&id)?;
        let delta = pos - pointer.last;
        pointer.last = pos;
        if !self.dragging && pos.distance(pointer.start) >= self.slop {
            self.dragging = true;
        }
        self.dragging.then_some(Gesture::Orbit {
            dx: delta.x,
            dy: delta.y,
        })
    }

    /// Last positions of the two lowest-numbered pointers
    fn pair(&self) -> Option<(Vec2, Vec2)> {
        let mut it = self.pointers.values();
        Some((it.next()?.last, it.next()?.last))
    }

    fn reset(&mut self) {
        self.multi = false;
        self.dragging = false;
    }
}

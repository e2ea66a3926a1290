//! Interactive viewport: orbit camera, pointer gestures and tap-to-select

pub mod camera;
pub mod gesture;
pub mod mesh;
pub mod picking;

use glam::Vec2;
use shared::PointerEvent;

use crate::error::{EngineError, Result};
use crate::state::scene::{RegionId, SceneState};
use crate::state::selection::SelectionState;
use crate::state::settings::CameraSettings;
use camera::OrbitCamera;
use gesture::{Gesture, GestureTracker};
use picking::{pick_region, RegionHit};

/// Outcome of a tap in the viewport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionChange {
    Selected(RegionId),
    /// Tap hit nothing; carries the region that was selected before, if any
    Deselected(Option<RegionId>),
}

/// Camera plus gesture state for one viewport
pub struct ViewportController {
    camera: OrbitCamera,
    gestures: GestureTracker,
    size: Vec2,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

impl ViewportController {
    pub fn new(settings: CameraSettings) -> Self {
        let slop = settings.tap_slop;
        Self {
            camera: OrbitCamera::new(settings),
            gestures: GestureTracker::new(slop),
            size: Vec2::new(1280.0, 720.0),
        }
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn resize(&mut self, width: f32, height: f32) -> Result<()> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(EngineError::invalid_value("viewport size", &format!("{width}x{height}")));
        }
        self.size = Vec2::new(width, height);
        Ok(())
    }

    /// Point the camera at the union of all region bounds. No-op without a scene.
    pub fn frame_scene(&mut self, scene: &SceneState) {
        if let Some(bounds) = scene.bounds() {
            self.camera.frame(&bounds);
            tracing::debug!(
                "Framed scene: target {:?}, distance {:.2}",
                self.camera.target,
                self.camera.distance
            );
        }
    }

    /// Nearest region under a viewport pixel
    pub fn pick(&self, position: Vec2, scene: &SceneState) -> Option<RegionHit> {
        let ray = self.camera.screen_ray(position, self.size);
        pick_region(&ray, scene)
    }

    /// Feed one pointer event. Drags move the camera; a tap selects the region
    /// under the pointer or clears the selection when nothing is hit.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        scene: &mut SceneState,
        selection: &mut SelectionState,
    ) -> Option<SelectionChange> {
        match self.gestures.handle(event)? {
            Gesture::Orbit { dx, dy } => {
                self.camera.rotate(dx, dy);
                None
            }
            Gesture::PinchPan { pinch, pan } => {
                self.camera.zoom(pinch);
                self.camera.pan(pan.x, pan.y);
                None
            }
            Gesture::Zoom { delta } => {
                self.camera.zoom(delta);
                None
            }
            Gesture::Tap { position } => Some(self.tap(position, scene, selection)),
        }
    }

    fn tap(&self, position: Vec2, scene: &mut SceneState, selection: &mut SelectionState) -> SelectionChange {
        match self.pick(position, scene) {
            Some(hit) if selection.select(scene, hit.region) => {
                tracing::debug!("Tap selected region {:?} at {:.2}", hit.region, hit.distance);
                SelectionChange::Selected(hit.region)
            }
            _ => SelectionChange::Deselected(selection.deselect(scene)),
        }
    }
}

//! Live capture session: collects fragments from the spatial-mapping source.

use std::time::{Duration, Instant};

use shared::Fragment;

use crate::aggregate::{combine, CombinedSurface};
use crate::error::{EngineError, Result};
use crate::state::settings::CaptureSettings;

/// Limits how often progress is reported
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True when at least one interval has passed since the last emission.
    /// The first call always passes.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Stopped,
}

/// Fragments of one capture, in arrival order. A fragment re-submitted under
/// an existing name replaces the earlier version in place.
#[derive(Debug)]
pub struct CaptureSession {
    state: CaptureState,
    fragments: Vec<Fragment>,
    target_fragments: usize,
    throttle: ProgressThrottle,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(&CaptureSettings::default())
    }
}

impl CaptureSession {
    pub fn new(settings: &CaptureSettings) -> Self {
        Self {
            state: CaptureState::Idle,
            fragments: Vec::new(),
            target_fragments: settings.target_fragments.max(1),
            throttle: ProgressThrottle::new(settings.progress_interval()),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == CaptureState::Capturing
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Begin a new capture, discarding fragments from any previous one.
    pub fn start(&mut self) {
        self.fragments.clear();
        self.throttle.reset();
        self.state = CaptureState::Capturing;
        tracing::info!("Capture started");
    }

    /// Freeze the capture. Idempotent; returns whether a capture was running.
    pub fn stop(&mut self) -> bool {
        if self.state != CaptureState::Capturing {
            return false;
        }
        self.state = CaptureState::Stopped;
        tracing::info!("Capture stopped with {} fragments", self.fragments.len());
        true
    }

    /// Add or replace a fragment. Rejected unless a capture is running.
    pub fn ingest(&mut self, fragment: Fragment) -> Result<()> {
        if !self.is_capturing() {
            return Err(EngineError::InvalidInput(format!(
                "fragment '{}' arrived while no capture is running",
                fragment.name
            )));
        }
        match self.fragments.iter_mut().find(|f| f.name == fragment.name) {
            Some(existing) => {
                tracing::debug!("Updated fragment '{}'", fragment.name);
                *existing = fragment;
            }
            None => {
                tracing::debug!("New fragment '{}'", fragment.name);
                self.fragments.push(fragment);
            }
        }
        Ok(())
    }

    /// Coverage estimate in `[0, 1]`
    pub fn progress(&self) -> f32 {
        (self.fragments.len() as f32 / self.target_fragments as f32).min(1.0)
    }

    /// Progress to report now, or `None` while throttled.
    pub fn poll_progress(&mut self, now: Instant) -> Option<f32> {
        self.throttle.ready(now).then(|| self.progress())
    }

    /// Aggregate the fragments collected so far
    pub fn combine(&self) -> Result<CombinedSurface> {
        combine(&self.fragments)
    }
}

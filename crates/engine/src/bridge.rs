//! Outbound half of the host bridge protocol.
//!
//! The engine pushes [`EngineEvent`]s through a [`HostBridge`] handle; the
//! receiving side (stdout writer, test, embedding host) turns them into
//! `{method, data}` messages. There is no request/response correlation.

use std::path::PathBuf;

use shared::BridgeMessage;
use tokio::sync::mpsc;

use crate::error::{EngineError, ErrorKind};

/// An event sent from the engine to the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Capture coverage in `[0, 1]`
    CaptureProgress(f32),
    SceneExported(PathBuf),
    SceneLoaded(PathBuf),
    /// Name of the selected region; `None` on deselect
    RegionSelected(Option<String>),
    EditApplied { selector: String },
    Error { kind: ErrorKind, message: String },
}

impl EngineEvent {
    pub fn error(err: &EngineError) -> Self {
        EngineEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            EngineEvent::CaptureProgress(_) => "capture-progress",
            EngineEvent::SceneExported(_) => "scene-exported",
            EngineEvent::SceneLoaded(_) => "scene-loaded",
            EngineEvent::RegionSelected(_) => "region-selected",
            EngineEvent::EditApplied { .. } => "edit-applied",
            EngineEvent::Error { .. } => "error",
        }
    }

    pub fn to_message(&self) -> BridgeMessage {
        let data = match self {
            EngineEvent::CaptureProgress(ratio) => format!("{ratio:.3}"),
            EngineEvent::SceneExported(path) | EngineEvent::SceneLoaded(path) => {
                path.display().to_string()
            }
            EngineEvent::RegionSelected(name) => name.clone().unwrap_or_default(),
            EngineEvent::EditApplied { selector } => selector.clone(),
            EngineEvent::Error { message, .. } => message.clone(),
        };
        BridgeMessage::new(self.method(), data)
    }
}

/// Sending handle for engine events.
///
/// Sends never block and never fail loudly: once the host side has gone away,
/// events are dropped with a debug log.
#[derive(Debug, Clone)]
pub struct HostBridge {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl HostBridge {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }

    /// A bridge plus the receiver its events arrive on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: EngineEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("Host bridge closed, dropping {}", e.0.method());
        }
    }

    /// Report a failure. Integrity violations are also logged as errors.
    pub fn report(&self, err: &EngineError) {
        match err.kind() {
            ErrorKind::Integrity => tracing::error!("{err}"),
            _ => tracing::warn!("{err}"),
        }
        self.send(EngineEvent::error(err));
    }
}

//! Inbound half of the host bridge protocol.
//!
//! Every message is `{method, data}`. Structured payloads travel as JSON text
//! inside `data`; plain payloads (paths, names, sizes) are used as is.

use serde::{Deserialize, Serialize};
use shared::{BridgeMessage, EditRequest, Fragment, PointerEvent};

use crate::aggregate::relief::{DepthMap, ReliefOptions};
use crate::error::{EngineError, Result};

/// Payload of `ingest-depth`: a depth grid to turn into a relief fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthRequest {
    pub name: String,
    #[serde(flatten)]
    pub map: DepthMap,
    #[serde(default)]
    pub options: ReliefOptions,
}

/// A command sent by the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    StartCapture,
    StopCapture,
    /// Fragment from the spatial-mapping source
    IngestFragment(Box<Fragment>),
    /// Depth grid from the depth model
    IngestDepth(Box<DepthRequest>),
    ExportScene,
    /// Load a container by file path or mesh-store ID
    LoadScene { path: String },
    ApplyEdit(EditRequest),
    /// Select a region by name; an empty name clears the selection
    SelectRegion { name: String },
    Undo,
    Redo,
    ResetAppearance,
    Pointer(PointerEvent),
    Resize { width: f32, height: f32 },
}

impl HostCommand {
    pub fn method(&self) -> &'static str {
        match self {
            HostCommand::StartCapture => "start-capture",
            HostCommand::StopCapture => "stop-capture",
            HostCommand::IngestFragment(_) => "ingest-fragment",
            HostCommand::IngestDepth(_) => "ingest-depth",
            HostCommand::ExportScene => "export-scene",
            HostCommand::LoadScene { .. } => "load-scene",
            HostCommand::ApplyEdit(_) => "apply-edit",
            HostCommand::SelectRegion { .. } => "select-region",
            HostCommand::Undo => "undo",
            HostCommand::Redo => "redo",
            HostCommand::ResetAppearance => "reset-appearance",
            HostCommand::Pointer(_) => "pointer",
            HostCommand::Resize { .. } => "resize",
        }
    }

    pub fn from_message(msg: &BridgeMessage) -> Result<Self> {
        let data = msg.data.as_str();
        let cmd = match msg.method.as_str() {
            "start-capture" => HostCommand::StartCapture,
            "stop-capture" => HostCommand::StopCapture,
            "ingest-fragment" => HostCommand::IngestFragment(Box::new(payload(msg)?)),
            "ingest-depth" => HostCommand::IngestDepth(Box::new(payload(msg)?)),
            "export-scene" => HostCommand::ExportScene,
            "load-scene" => {
                let path = data.trim();
                if path.is_empty() {
                    return Err(EngineError::InvalidInput("load-scene needs a path".into()));
                }
                HostCommand::LoadScene {
                    path: path.to_string(),
                }
            }
            "apply-edit" => HostCommand::ApplyEdit(payload(msg)?),
            "select-region" => HostCommand::SelectRegion {
                name: data.trim().to_string(),
            },
            "undo" => HostCommand::Undo,
            "redo" => HostCommand::Redo,
            "reset-appearance" => HostCommand::ResetAppearance,
            "pointer" => HostCommand::Pointer(payload(msg)?),
            "resize" => {
                let (width, height) = parse_size(data)?;
                HostCommand::Resize { width, height }
            }
            other => {
                return Err(EngineError::InvalidInput(format!("unknown method '{other}'")));
            }
        };
        Ok(cmd)
    }

    /// Parse one newline-delimited JSON line
    pub fn from_json_line(line: &str) -> Result<Self> {
        let msg: BridgeMessage = serde_json::from_str(line)
            .map_err(|e| EngineError::InvalidInput(format!("invalid bridge message: {e}")))?;
        Self::from_message(&msg)
    }

    pub fn to_message(&self) -> BridgeMessage {
        let data = match self {
            HostCommand::IngestFragment(f) => to_json(f),
            HostCommand::IngestDepth(d) => to_json(d),
            HostCommand::LoadScene { path } => path.clone(),
            HostCommand::ApplyEdit(req) => to_json(req),
            HostCommand::SelectRegion { name } => name.clone(),
            HostCommand::Pointer(event) => to_json(event),
            HostCommand::Resize { width, height } => format!("{width}x{height}"),
            _ => String::new(),
        };
        BridgeMessage::new(self.method(), data)
    }
}

fn payload<T: for<'de> Deserialize<'de>>(msg: &BridgeMessage) -> Result<T> {
    serde_json::from_str(&msg.data)
        .map_err(|e| EngineError::InvalidInput(format!("{} payload: {e}", msg.method)))
}

fn to_json<T: Serialize>(value: &T) -> String {
    // Payload types are plain data; serialization cannot fail
    serde_json::to_string(value).unwrap_or_default()
}

/// Parse `"WxH"` into positive pixel dimensions.
fn parse_size(data: &str) -> Result<(f32, f32)> {
    let invalid = || EngineError::invalid_value("viewport size", data);
    let (w, h) = data.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: f32 = w.trim().parse().map_err(|_| invalid())?;
    let height: f32 = h.trim().parse().map_err(|_| invalid())?;
    if width > 0.0 && height > 0.0 {
        Ok((width, height))
    } else {
        Err(invalid())
    }
}

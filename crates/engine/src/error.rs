//! Engine error type.
//!
//! Every fallible engine operation returns [`EngineError`]. Failures never cross
//! the host boundary as panics; the engine turns them into `error` events.

use thiserror::Error;

/// Coarse failure category reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or invalid aggregation/edit input
    Input,
    /// Malformed or unsupported container
    Format,
    /// No region matched an edit or selection target
    RegionResolution,
    /// Texture fetch failed; editor state is unchanged
    Network,
    /// Internal invariant violated; the operation was aborted
    Integrity,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no fragments to combine")]
    EmptyInput,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("unsupported container version {0} (expected 2)")]
    UnsupportedVersion(u32),

    #[error("no region matches '{0}'")]
    NoMatchingRegion(String),

    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("invalid value '{value}' for {property}")]
    InvalidValue { property: String, value: String },

    #[error("material preset '{0}' not found")]
    PresetNotFound(String),

    #[error("texture fetch failed: {0}")]
    Network(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::EmptyInput
            | EngineError::InvalidInput(_)
            | EngineError::UnknownProperty(_)
            | EngineError::InvalidValue { .. }
            | EngineError::PresetNotFound(_)
            | EngineError::Io(_) => ErrorKind::Input,
            EngineError::MalformedContainer(_) | EngineError::UnsupportedVersion(_) => {
                ErrorKind::Format
            }
            EngineError::NoMatchingRegion(_) => ErrorKind::RegionResolution,
            EngineError::Network(_) => ErrorKind::Network,
            EngineError::Integrity(_) => ErrorKind::Integrity,
        }
    }

    pub(crate) fn invalid_value(property: &str, value: &str) -> Self {
        EngineError::InvalidValue {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        EngineError::MalformedContainer(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

// Library crate: the whole engine, driven headlessly by the binary, the
// integration tests and any embedding host.

pub mod aggregate;
pub mod bridge;
pub mod capture;
pub mod command;
pub mod container;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod state;
pub mod store;
pub mod texture;
pub mod validation;
pub mod viewport;

pub use bridge::{EngineEvent, HostBridge};
pub use command::HostCommand;
pub use engine::RoomEngine;
pub use error::{EngineError, ErrorKind, Result};

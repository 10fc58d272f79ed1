//! Engine notifications and queued host commands.

pub mod bus;
pub mod types;

pub use bus::EventBus;
pub use types::{Command, EngineEvent};

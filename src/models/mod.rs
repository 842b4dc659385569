//! Domain models shared across the LTP server.

pub mod position;
pub mod signal;
pub mod tick;

pub use position::{Phase, Position, StateSnapshot};
pub use signal::{Signal, SignalKind};
pub use tick::Tick;

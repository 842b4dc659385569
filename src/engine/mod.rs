//! Core engine: signal parsing and the position state machine.

pub mod parser;
pub mod state_machine;

pub use parser::{parse, ParseError};
pub use state_machine::{SignalOutcome, StateMachine};

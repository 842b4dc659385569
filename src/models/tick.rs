//! # models::tick
//!
//! Defines [`Tick`], the last-traded-price pulse every tick source feeds into
//! the state machine.
//!
//! The `time` label is opaque: Binance trades carry an exchange timestamp,
//! CSV replays carry whatever the file's `time` column holds. The engine never
//! orders or validates it, it is only passed through to recorders and the
//! WebSocket stream.

use serde::{Deserialize, Serialize};

/// A single price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Last traded price.
    pub price: f64,

    /// Source-provided time label, e.g. `"14:03:21"`.
    #[serde(default)]
    pub time: String,
}

impl Tick {
    pub fn new(price: f64, time: impl Into<String>) -> Self {
        Self { price, time: time.into() }
    }
}

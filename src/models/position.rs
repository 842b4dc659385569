//! # models::position
//!
//! The tracked position and the read-only [`StateSnapshot`] handed out to
//! HTTP / WebSocket readers.
//!
//! ## Phase vs Position
//! There is no stored phase flag. [`Phase`] is derived from whether a
//! [`Position`] exists, so "position present iff phase = POSITION" cannot be
//! broken by a partial update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Phase ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    NoPosition,
    Position,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NoPosition => "NO_POSITION",
            Phase::Position   => "POSITION",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Position ─────────────────────────────────────────────────────────────────

/// A paper position opened by an ENTRY signal and closed by an EXIT signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Internal id, useful for correlating recorder rows with dashboard state.
    pub position_id: Uuid,
    /// LTP at the moment the ENTRY signal was processed.
    pub entry_price: f64,
    pub entry_time:  DateTime<Utc>,
    /// Threshold carried by the ENTRY signal.
    pub threshold:   u64,
}

impl Position {
    pub fn open(entry_price: f64, threshold: u64) -> Self {
        Self {
            position_id: Uuid::new_v4(),
            entry_price,
            entry_time: Utc::now(),
            threshold,
        }
    }

    /// Paper profit/loss at `price`.
    #[inline]
    pub fn pnl_at(&self, price: f64) -> f64 {
        price - self.entry_price
    }

    /// `true` when `price` is at or above the threshold.
    #[inline]
    pub fn is_above_threshold(&self, price: f64) -> bool {
        price >= self.threshold as f64
    }
}

// ─── StateSnapshot ────────────────────────────────────────────────────────────

/// Owned copy of the state machine at one point in the processing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub phase:         Phase,
    pub position:      Option<Position>,
    pub current_price: f64,
    pub paper_pnl:     f64,
}

//! # models::signal
//!
//! [`Signal`] is the structured form of an externally-issued directive such as
//! `"Accepted Entry + priorRisePct=0.05 | stopPx=98000 | sym=BTCUSDT"`.
//! See [`crate::engine::parser`] for how text becomes a `Signal`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── SignalKind ───────────────────────────────────────────────────────────────

/// Direction of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    /// Open a position at the current price.
    Entry,
    /// Close the open position at the current price.
    Exit,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Entry => "ENTRY",
            SignalKind::Exit  => "EXIT",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Signal ───────────────────────────────────────────────────────────────────

/// A parsed directive. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,

    /// Price level carried by `stopPx=`; `0` when the text had none.
    pub threshold: u64,

    /// Value of `sym=`; `"BTCUSDT"` when the text had none.
    pub symbol: String,

    /// Clock reading taken when the text was parsed.
    pub timestamp: DateTime<Utc>,

    /// Original text, kept for audit.
    pub raw: String,
}

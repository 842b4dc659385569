//! # events
//!
//! Defines [`CondensedEvent`] — the de-duplicated, state-transition-triggered
//! notifications the state machine produces — and [`WsEvent`], the envelope
//! streamed to WebSocket clients.
//!
//! Condensed events go to each sink on its own typed queue. WebSocket messages
//! travel as pre-serialized JSON `String`s on a `broadcast` channel, so a slow
//! browser never holds up a sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::StateSnapshot;

// ─── EventKind ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A position was opened.
    EntrySignal,
    /// The open position was closed.
    ExitSignal,
    /// LTP moved from below the threshold to at/above it.
    LtpCrossUp,
    /// LTP moved from at/above the threshold to below it.
    LtpCrossDown,
    /// Paper PnL moved from negative to zero or above.
    PnlCrossPositive,
    /// Paper PnL moved from zero or above to negative.
    PnlCrossNegative,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::EntrySignal      => "ENTRY_SIGNAL",
            EventKind::ExitSignal       => "EXIT_SIGNAL",
            EventKind::LtpCrossUp       => "LTP_CROSS_UP",
            EventKind::LtpCrossDown     => "LTP_CROSS_DOWN",
            EventKind::PnlCrossPositive => "PNL_CROSS_POSITIVE",
            EventKind::PnlCrossNegative => "PNL_CROSS_NEGATIVE",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── CondensedEvent ───────────────────────────────────────────────────────────

/// `(eventKind, ltp, pnl, threshold)` plus the wall-clock time it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondensedEvent {
    pub kind:      EventKind,
    pub ltp:       f64,
    pub pnl:       f64,
    pub threshold: u64,
    pub at:        DateTime<Utc>,
}

impl CondensedEvent {
    pub fn new(kind: EventKind, ltp: f64, pnl: f64, threshold: u64) -> Self {
        Self { kind, ltp, pnl, threshold, at: Utc::now() }
    }
}

// ─── WsEvent ──────────────────────────────────────────────────────────────────

/// Every message a WebSocket client can receive.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    /// Sent once on connect: which tick source feeds this server.
    Source {
        source: String,
    },

    /// Sent once on connect: the state at connection time.
    Snapshot {
        state: StateSnapshot,
    },

    /// Every processed tick.
    Tick {
        price: f64,
        time:  String,
    },

    /// Every condensed event, in production order.
    Event {
        #[serde(flatten)]
        event: CondensedEvent,
    },
}

impl WsEvent {
    /// Serialize to a JSON text frame.
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"serialization_error"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_wire_names() {
        let json = serde_json::to_string(&EventKind::PnlCrossNegative).unwrap();
        assert_eq!(json, r#""PNL_CROSS_NEGATIVE""#);
        assert_eq!(EventKind::LtpCrossUp.to_string(), "LTP_CROSS_UP");
    }

    #[test]
    fn test_ws_event_envelope() {
        let tick = WsEvent::Tick { price: 101.5, time: "10:00:01".into() };
        let value: serde_json::Value = serde_json::from_str(&tick.to_json()).unwrap();
        assert_eq!(value["type"], "tick");
        assert_eq!(value["price"], 101.5);

        let event = WsEvent::Event {
            event: CondensedEvent::new(EventKind::EntrySignal, 95.0, 0.0, 100),
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(value["type"], "event");
        assert_eq!(value["kind"], "ENTRY_SIGNAL");
        assert_eq!(value["threshold"], 100);
    }
}

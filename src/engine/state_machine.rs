//! # engine::state_machine
//!
//! **Position State Machine** — owns the single tracked position and turns
//! ticks and signals into condensed events.
//!
//! ```text
//!                 ENTRY (open at LTP)
//!   NO_POSITION ───────────────────────▶ POSITION
//!        ▲                                  │
//!        └──────────────────────────────────┘
//!                 EXIT (close at LTP)
//! ```
//!
//! ## Per-tick evaluation (POSITION only)
//! ```text
//! 1. paper_pnl = price − entry_price
//! 2. above     = price ≥ threshold   → LTP_CROSS_UP / LTP_CROSS_DOWN on change
//! 3. positive  = paper_pnl ≥ 0       → PNL_CROSS_POSITIVE / PNL_CROSS_NEGATIVE on change
//! ```
//! The first tick after an ENTRY only seeds both trackers.
//!
//! The machine does no I/O and holds no lock. The caller serializes access
//! (see [`crate::state::AppState`]) and publishes the returned events.

use tracing::{debug, info, warn};

use crate::events::{CondensedEvent, EventKind};
use crate::models::{Phase, Position, Signal, SignalKind, StateSnapshot};

// ─── Crossing Trackers ────────────────────────────────────────────────────────

/// Last observed classification. `None` until the first tick of a position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossingTrackers {
    pub above_threshold: Option<bool>,
    pub pnl_positive:    Option<bool>,
}

/// Record `now` into `tracker`. Returns `Some(now)` only when a previously
/// seeded value flipped.
#[inline]
fn observe(tracker: &mut Option<bool>, now: bool) -> Option<bool> {
    let flipped = matches!(*tracker, Some(prev) if prev != now);
    *tracker = Some(now);
    flipped.then_some(now)
}

// ─── Signal Outcome ───────────────────────────────────────────────────────────

/// What happened to a signal handed to [`StateMachine::on_signal`].
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    /// The transition happened; the event has been produced.
    Accepted(CondensedEvent),
    /// Signal incompatible with the current phase. Nothing changed.
    Rejected {
        kind:  SignalKind,
        phase: Phase,
    },
}

impl SignalOutcome {
    pub fn event(&self) -> Option<&CondensedEvent> {
        match self {
            SignalOutcome::Accepted(event) => Some(event),
            SignalOutcome::Rejected { .. } => None,
        }
    }

    #[cfg(test)]
    pub fn is_accepted(&self) -> bool {
        matches!(self, SignalOutcome::Accepted(_))
    }
}

// ─── Open Position ────────────────────────────────────────────────────────────

/// A position and the trackers that live and die with it.
#[derive(Debug, Clone)]
struct Open {
    position: Position,
    trackers: CrossingTrackers,
}

// ─── State Machine ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    open:          Option<Open>,
    current_price: f64,
    paper_pnl:     f64,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.open.is_some() {
            Phase::Position
        } else {
            Phase::NoPosition
        }
    }

    #[cfg(test)]
    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    #[cfg(test)]
    pub fn paper_pnl(&self) -> f64 {
        self.paper_pnl
    }

    pub fn position(&self) -> Option<&Position> {
        self.open.as_ref().map(|o| &o.position)
    }

    /// Trackers of the open position, `None` while flat.
    #[cfg(test)]
    pub fn trackers(&self) -> Option<CrossingTrackers> {
        self.open.as_ref().map(|o| o.trackers)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase:         self.phase(),
            position:      self.position().cloned(),
            current_price: self.current_price,
            paper_pnl:     self.paper_pnl,
        }
    }

    // ── Tick ──────────────────────────────────────────────────────────────────

    /// Process one tick. Returns the crossing events it caused, threshold
    /// crossing first.
    pub fn on_tick(&mut self, price: f64) -> Vec<CondensedEvent> {
        self.current_price = price;

        let Some(open) = self.open.as_mut() else {
            return Vec::new();
        };

        let pnl = open.position.pnl_at(price);
        self.paper_pnl = pnl;

        let threshold = open.position.threshold;
        let mut events = Vec::new();

        // ── 1. LTP vs threshold ───────────────────────────────────────────────
        let above = open.position.is_above_threshold(price);
        if let Some(now_above) = observe(&mut open.trackers.above_threshold, above) {
            let kind = if now_above { EventKind::LtpCrossUp } else { EventKind::LtpCrossDown };
            info!(event = %kind, ltp = price, threshold, "📈 Threshold crossed");
            events.push(CondensedEvent::new(kind, price, pnl, threshold));
        }

        // ── 2. PnL sign ───────────────────────────────────────────────────────
        let positive = pnl >= 0.0;
        if let Some(now_positive) = observe(&mut open.trackers.pnl_positive, positive) {
            let kind = if now_positive {
                EventKind::PnlCrossPositive
            } else {
                EventKind::PnlCrossNegative
            };
            info!(event = %kind, ltp = price, pnl = %format!("{pnl:.2}"), "💰 PnL sign changed");
            events.push(CondensedEvent::new(kind, price, pnl, threshold));
        }

        events
    }

    // ── Signal ────────────────────────────────────────────────────────────────

    /// Apply a signal. Transitions that do not fit the current phase are
    /// rejected without touching any state.
    pub fn on_signal(&mut self, signal: &Signal) -> SignalOutcome {
        debug!(kind = %signal.kind, ltp = self.current_price, "Signal received");

        match (signal.kind, self.open.as_ref()) {
            (SignalKind::Entry, None) => {
                let entry_price = self.current_price;
                self.open = Some(Open {
                    position: Position::open(entry_price, signal.threshold),
                    trackers: CrossingTrackers::default(),
                });
                self.paper_pnl = 0.0;

                info!(
                    entry_price,
                    threshold = signal.threshold,
                    symbol    = %signal.symbol,
                    "✓ ENTRY: opened position"
                );

                SignalOutcome::Accepted(CondensedEvent::new(
                    EventKind::EntrySignal,
                    entry_price,
                    0.0,
                    signal.threshold,
                ))
            }

            (SignalKind::Exit, Some(open)) => {
                let event = CondensedEvent::new(
                    EventKind::ExitSignal,
                    self.current_price,
                    self.paper_pnl,
                    open.position.threshold,
                );

                info!(
                    exit_price = self.current_price,
                    pnl        = %format!("{:.2}", self.paper_pnl),
                    "✓ EXIT: closed position"
                );

                self.open = None;
                self.paper_pnl = 0.0;

                SignalOutcome::Accepted(event)
            }

            (kind, _) => {
                let phase = self.phase();
                warn!(%kind, %phase, "✗ Invalid transition — signal ignored");
                SignalOutcome::Rejected { kind, phase }
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn signal(kind: SignalKind, threshold: u64) -> Signal {
        Signal {
            kind,
            threshold,
            symbol:    "BTCUSDT".to_string(),
            timestamp: Utc::now(),
            raw:       format!("{kind} stopPx={threshold}"),
        }
    }

    fn kinds(events: &[CondensedEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    fn open_at(price: f64, threshold: u64) -> StateMachine {
        let mut sm = StateMachine::new();
        sm.on_tick(price);
        assert!(sm.on_signal(&signal(SignalKind::Entry, threshold)).is_accepted());
        sm
    }

    #[test]
    fn test_initial_state() {
        let sm = StateMachine::new();
        let snap = sm.snapshot();
        assert_eq!(snap.phase, Phase::NoPosition);
        assert!(snap.position.is_none());
        assert_eq!(snap.paper_pnl, 0.0);
    }

    #[test]
    fn test_tick_without_position_only_updates_price() {
        let mut sm = StateMachine::new();
        assert!(sm.on_tick(123.5).is_empty());
        assert_eq!(sm.current_price(), 123.5);
        assert_eq!(sm.paper_pnl(), 0.0);
    }

    #[test]
    fn test_entry_opens_at_current_price() {
        let mut sm = StateMachine::new();
        sm.on_tick(95.0);

        let outcome = sm.on_signal(&signal(SignalKind::Entry, 100));
        let event = outcome.event().unwrap();
        assert_eq!(event.kind, EventKind::EntrySignal);
        assert_eq!((event.ltp, event.pnl, event.threshold), (95.0, 0.0, 100));

        let snap = sm.snapshot();
        assert_eq!(snap.phase, Phase::Position);
        let position = snap.position.unwrap();
        assert_eq!(position.entry_price, 95.0);
        assert_eq!(position.threshold, 100);
        assert_eq!(sm.trackers(), Some(CrossingTrackers::default()));
    }

    #[test]
    fn test_first_tick_after_entry_only_seeds() {
        let mut sm = open_at(95.0, 100);

        // Far above threshold and in profit: still no event on the seed tick.
        assert!(sm.on_tick(150.0).is_empty());
        assert_eq!(
            sm.trackers(),
            Some(CrossingTrackers { above_threshold: Some(true), pnl_positive: Some(true) })
        );
    }

    #[test]
    fn test_cross_up_scenario() {
        let mut sm = open_at(95.0, 100);
        assert!(sm.on_tick(95.0).is_empty()); // seed: below, pnl 0 → positive

        let events = sm.on_tick(101.0);
        assert_eq!(kinds(&events), vec![EventKind::LtpCrossUp]);
        assert_eq!((events[0].ltp, events[0].pnl, events[0].threshold), (101.0, 6.0, 100));
        assert_eq!(sm.paper_pnl(), 6.0);
    }

    #[test]
    fn test_cross_down_and_pnl_negative_same_tick_ordered() {
        let mut sm = open_at(100.0, 100);
        assert!(sm.on_tick(100.0).is_empty()); // seed: above (equal), positive (zero)

        let events = sm.on_tick(99.0);
        assert_eq!(
            kinds(&events),
            vec![EventKind::LtpCrossDown, EventKind::PnlCrossNegative]
        );
        assert_eq!(events[1].pnl, -1.0);

        let events = sm.on_tick(100.0);
        assert_eq!(
            kinds(&events),
            vec![EventKind::LtpCrossUp, EventKind::PnlCrossPositive]
        );
    }

    #[test]
    fn test_no_repeat_without_flip() {
        let mut sm = open_at(95.0, 100);
        sm.on_tick(95.0);
        assert_eq!(sm.on_tick(101.0).len(), 1);
        assert!(sm.on_tick(102.0).is_empty());
        assert!(sm.on_tick(100.0).is_empty()); // equality stays "above"
    }

    #[test]
    fn test_exit_reports_pre_close_pnl() {
        let mut sm = open_at(100.0, 100);
        sm.on_tick(90.0);

        let outcome = sm.on_signal(&signal(SignalKind::Exit, 0));
        let event = outcome.event().unwrap();
        assert_eq!(event.kind, EventKind::ExitSignal);
        assert_eq!((event.ltp, event.pnl, event.threshold), (90.0, -10.0, 100));

        let snap = sm.snapshot();
        assert_eq!(snap.phase, Phase::NoPosition);
        assert!(snap.position.is_none());
        assert_eq!(snap.paper_pnl, 0.0);
        assert_eq!(snap.current_price, 90.0);
    }

    #[test]
    fn test_rejected_transitions_change_nothing() {
        let mut sm = StateMachine::new();
        sm.on_tick(50.0);
        let before = sm.snapshot();
        assert_eq!(
            sm.on_signal(&signal(SignalKind::Exit, 10)),
            SignalOutcome::Rejected { kind: SignalKind::Exit, phase: Phase::NoPosition }
        );
        assert_eq!(sm.snapshot(), before);

        let mut sm = open_at(50.0, 60);
        sm.on_tick(55.0);
        let before   = sm.snapshot();
        let trackers = sm.trackers();
        let outcome  = sm.on_signal(&signal(SignalKind::Entry, 999));
        assert!(outcome.event().is_none());
        assert_eq!(sm.snapshot(), before);
        assert_eq!(sm.trackers(), trackers);
    }

    #[test]
    fn test_reentry_resets_trackers() {
        let mut sm = open_at(100.0, 100);
        sm.on_tick(110.0);
        sm.on_signal(&signal(SignalKind::Exit, 0));

        sm.on_signal(&signal(SignalKind::Entry, 120));
        assert_eq!(sm.trackers(), Some(CrossingTrackers::default()));
        assert_eq!(sm.position().unwrap().entry_price, 110.0);
        assert!(sm.on_tick(90.0).is_empty());
    }
}

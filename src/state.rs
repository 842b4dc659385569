//! # state
//!
//! The shared application state and the **single serialization point** for
//! every mutation of the position state machine.
//!
//! ## Ordering
//! * Ticks and signals both take the `RwLock` write guard around
//!   [`StateMachine`]. Only one of them mutates at a time.
//! * Events produced under the guard are handed to every registered sink and
//!   to the WebSocket channel *before* the guard is released, so every
//!   subscriber sees them in production order.
//! * Snapshot readers take the read guard and clone. They never observe a
//!   half-applied tick or signal.
//!
//! Each registered sink owns an unbounded `mpsc` queue. Publishing never
//! blocks the producer and never drops an item; sinks drain their queues in
//! separate tasks (see [`crate::sink`]). WebSocket clients use a lossy
//! `broadcast` channel instead, since a dashboard can resync from a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, trace};

use crate::engine::{SignalOutcome, StateMachine};
use crate::events::{CondensedEvent, WsEvent};
use crate::models::{Signal, StateSnapshot, Tick};

/// Buffered WebSocket frames per client.
const WS_CAPACITY: usize = 256;

// ─── Fan-out ──────────────────────────────────────────────────────────────────

/// One unbounded queue per registered sink. Queues whose receiver is gone are
/// pruned on the next send.
struct Fanout<T> {
    senders: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone> Fanout<T> {
    fn new() -> Self {
        Self { senders: Mutex::new(Vec::new()) }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    fn send(&self, item: &T) {
        self.lock().retain(|tx| {
            let alive = tx.send(item.clone()).is_ok();
            if !alive {
                debug!("Sink queue closed — unregistered");
            }
            alive
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<T>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ─── AppState ─────────────────────────────────────────────────────────────────

/// Top-level shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    // ── Core ──────────────────────────────────────────────────────────────────
    /// The only writer path is [`AppState::ingest_tick`] /
    /// [`AppState::apply_signal`].
    machine: Arc<RwLock<StateMachine>>,

    // ── Egress ────────────────────────────────────────────────────────────────
    /// Condensed events, in production order, to every event sink.
    event_sinks: Arc<Fanout<CondensedEvent>>,

    /// Every processed tick, for the tick recorder.
    tick_sinks: Arc<Fanout<Tick>>,

    /// Pre-serialized JSON frames for WebSocket clients.
    pub ws_tx: broadcast::Sender<String>,

    // ── Metadata ──────────────────────────────────────────────────────────────
    /// Label of the configured tick source, reported to WebSocket clients.
    pub source: Arc<str>,

    // ── Metrics ───────────────────────────────────────────────────────────────
    pub tick_count:   Arc<AtomicU64>,
    pub signal_count: Arc<AtomicU64>,
    pub event_count:  Arc<AtomicU64>,
}

impl AppState {
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        let (ws_tx, _) = broadcast::channel(WS_CAPACITY);

        Self {
            machine:      Arc::new(RwLock::new(StateMachine::new())),
            event_sinks:  Arc::new(Fanout::new()),
            tick_sinks:   Arc::new(Fanout::new()),
            ws_tx,
            source:       source.into(),
            tick_count:   Arc::new(AtomicU64::new(0)),
            signal_count: Arc::new(AtomicU64::new(0)),
            event_count:  Arc::new(AtomicU64::new(0)),
        }
    }

    // ── Writers ───────────────────────────────────────────────────────────────

    /// Feed one tick through the state machine and publish what it produced.
    /// The returned snapshot is taken under the same guard as the events.
    pub async fn ingest_tick(&self, tick: Tick) -> (Vec<CondensedEvent>, StateSnapshot) {
        let mut machine = self.machine.write().await;
        let events = machine.on_tick(tick.price);

        self.tick_count.fetch_add(1, Ordering::Relaxed);
        trace!(price = tick.price, time = %tick.time, "tick");

        self.broadcast(&WsEvent::Tick { price: tick.price, time: tick.time.clone() });
        self.tick_sinks.send(&tick);
        self.publish(&events);

        let snap = machine.snapshot();
        drop(machine);
        (events, snap)
    }

    /// Apply a parsed signal and publish the resulting event, if any.
    pub async fn apply_signal(&self, signal: &Signal) -> SignalOutcome {
        let mut machine = self.machine.write().await;
        let outcome = machine.on_signal(signal);

        self.signal_count.fetch_add(1, Ordering::Relaxed);
        if let Some(event) = outcome.event() {
            self.publish(std::slice::from_ref(event));
        }

        drop(machine);
        outcome
    }

    // ── Readers ───────────────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> StateSnapshot {
        self.machine.read().await.snapshot()
    }

    /// Register a new event sink. It receives every event published after
    /// this call, once and in order.
    pub fn subscribe_events(&self) -> mpsc::UnboundedReceiver<CondensedEvent> {
        self.event_sinks.subscribe()
    }

    pub fn subscribe_ticks(&self) -> mpsc::UnboundedReceiver<Tick> {
        self.tick_sinks.subscribe()
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Broadcast a frame to all WebSocket clients. No listener is not an error.
    pub fn broadcast(&self, event: &WsEvent) {
        let _ = self.ws_tx.send(event.to_json());
    }

    fn publish(&self, events: &[CondensedEvent]) {
        for event in events {
            self.event_count.fetch_add(1, Ordering::Relaxed);
            self.event_sinks.send(event);
            self.broadcast(&WsEvent::Event { event: event.clone() });
        }
    }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state(source: impl Into<Arc<str>>) -> SharedState {
    Arc::new(AppState::new(source))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

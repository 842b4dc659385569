//! # routes::monitor
//!
//! Read-side endpoints for dashboards.
//!
//! | Method    | Path      | Description                                   |
//! |-----------|-----------|-----------------------------------------------|
//! | GET (WS)  | `/ws`     | Live stream of ticks and condensed events     |
//! | GET       | `/state`  | Current state snapshot                        |
//! | GET       | `/health` | Counters and tick source                      |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::atomic::Ordering;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::{events::WsEvent, state::SharedState};

// ─── WebSocket Handler ────────────────────────────────────────────────────────

/// Upgrade HTTP → WebSocket and stream every frame from the broadcast channel.
pub async fn ws_monitor(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    // Subscribe before reading the snapshot so nothing falls in between.
    let mut rx = state.ws_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    info!("✓ New client connected");

    let greeting = [
        WsEvent::Source { source: state.source.to_string() },
        WsEvent::Snapshot { state: state.snapshot().await },
    ];
    for frame in greeting {
        if sender.send(Message::Text(frame.to_json())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(json_str) => {
                        if sender.send(Message::Text(json_str)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!("WS client lagged, skipped {n} frames");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            result = receiver.next() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("Client disconnected");
}

// ─── REST Endpoints ───────────────────────────────────────────────────────────

/// GET /state — read-only snapshot
pub async fn get_state(State(state): State<SharedState>) -> impl IntoResponse {
    let snapshot = state.snapshot().await;
    Json(json!({
        "ok":    true,
        "state": snapshot,
    }))
}

/// GET /health
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let phase = state.snapshot().await.phase;

    Json(json!({
        "ok":           true,
        "source":       &*state.source,
        "phase":        phase,
        "tick_count":   state.tick_count.load(Ordering::Relaxed),
        "signal_count": state.signal_count.load(Ordering::Relaxed),
        "event_count":  state.event_count.load(Ordering::Relaxed),
    }))
}

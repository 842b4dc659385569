//! # source::binance
//!
//! Live ticks from the Binance public trade stream
//! (`wss://stream.binance.com:9443/ws/btcusdt@trade` by default).
//!
//! The connection is re-established after a fixed delay whenever it closes or
//! errors. The worker only stops when the tick channel is closed.

use std::time::Duration;

use chrono::DateTime;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc::Sender;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::models::Tick;

/// The fields of a `<symbol>@trade` payload this server uses.
#[derive(Debug, Deserialize)]
struct TradeMessage {
    /// Price, sent as a decimal string.
    #[serde(rename = "p")]
    price: String,
    /// Trade time, epoch milliseconds.
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Turn one trade payload into a [`Tick`]. Non-trade or malformed payloads
/// yield `None`.
fn parse_trade(raw: &str) -> Option<Tick> {
    let msg: TradeMessage = serde_json::from_str(raw).ok()?;
    let price: f64 = msg.price.parse().ok()?;
    if !price.is_finite() {
        return None;
    }

    let time = DateTime::from_timestamp_millis(msg.trade_time)
        .map(|t| t.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_default();

    Some(Tick::new(price, time))
}

pub struct BinanceFeed {
    pub url:             String,
    pub reconnect_delay: Duration,
}

impl BinanceFeed {
    pub fn new(url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self { url: url.into(), reconnect_delay }
    }

    #[instrument(skip(self, tx), fields(url = %self.url))]
    pub async fn run(self, tx: Sender<Tick>) -> anyhow::Result<()> {
        info!("Connecting to Binance WebSocket...");

        loop {
            match connect_async(self.url.as_str()).await {
                Ok((mut ws, _)) => {
                    info!("✓ Connected to Binance trade stream");

                    while let Some(msg) = ws.next().await {
                        let msg = match msg {
                            Ok(m) => m,
                            Err(e) => {
                                warn!(error = %e, "Binance stream error");
                                break;
                            }
                        };

                        match msg {
                            Message::Text(text) => match parse_trade(&text) {
                                Some(tick) => {
                                    trace!(price = tick.price, "trade");
                                    if tx.send(tick).await.is_err() {
                                        info!("Tick channel closed — stopping Binance feed");
                                        return Ok(());
                                    }
                                }
                                None => debug!(raw = %text, "Ignoring non-trade message"),
                            },
                            Message::Close(frame) => {
                                info!(?frame, "Binance closed the connection");
                                break;
                            }
                            _ => {} // ping/pong/binary
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "✗ Binance connection failed");
                }
            }

            if tx.is_closed() {
                return Ok(());
            }

            info!(delay = ?self.reconnect_delay, "Connection closed. Reconnecting...");
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }
}

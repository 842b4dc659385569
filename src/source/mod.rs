//! # source
//!
//! Tick sources and the single ingest task that feeds the state machine.
//!
//! ```text
//!  BinanceFeed ─┐
//!               ├─▶ mpsc<Tick> ─▶ ingest task ─▶ AppState::ingest_tick
//!  CsvReplay  ──┘
//! ```
//! With `TICK_SOURCE=http` no feed is started and ticks arrive only through
//! `POST /tick`.

pub mod binance;
pub mod csv_replay;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::{Config, TickSourceKind};
use crate::models::Tick;
use crate::state::SharedState;

pub use binance::BinanceFeed;
pub use csv_replay::CsvReplay;

const TICK_CHANNEL_CAPACITY: usize = 1024;

/// Start the configured feed and its ingest task. Returns no handles when the
/// source is `http`.
pub fn start(config: &Config, state: SharedState) -> anyhow::Result<Vec<JoinHandle<()>>> {
    let (tx, rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);

    let feed = match config.tick_source {
        TickSourceKind::Binance => {
            info!("Using Binance input...");
            let feed = BinanceFeed::new(&config.binance_ws_url, config.binance_reconnect);
            spawn_feed("binance", feed.run(tx))
        }
        TickSourceKind::Csv => {
            info!(file = %config.csv_file.display(), "Using CSV input...");
            let replay = CsvReplay::from_file(&config.csv_file, config.csv_tick_interval)?;
            spawn_feed("csv", replay.run(tx))
        }
        TickSourceKind::Http => {
            info!("No background tick feed — accepting ticks on POST /tick");
            return Ok(Vec::new());
        }
    };

    Ok(vec![feed, spawn_ingest(state, rx)])
}

fn spawn_feed<F>(name: &'static str, run: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = run.await {
            error!(source = name, error = %e, "Tick source stopped");
        }
    })
}

/// The only consumer of the tick channel. Ticks reach the state machine in
/// the order the feed produced them.
pub fn spawn_ingest(state: SharedState, mut rx: mpsc::Receiver<Tick>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(tick) = rx.recv().await {
            state.ingest_tick(tick).await;
        }
        info!("Tick channel closed — ingest stopped");
    })
}

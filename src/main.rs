//! # LTP Server — Signal-Driven Position Tracker
//!
//! ```text
//!  ┌─────────────┐  wss trade stream / CSV replay   ┌──────────────────────────┐
//!  │ Tick Source │ ───────────────────────────────▶ │ AppState                 │
//!  └─────────────┘        (or POST /tick)           │ └─ RwLock<StateMachine>  │
//!                                                   │     on_tick / on_signal  │
//!  ┌─────────────┐  POST /signal (plain text)       │                          │
//!  │ TradingView │ ───────────────────────────────▶ │ event bus ──┬──────────┐ │
//!  └─────────────┘                                  └─────────────┼──────────┼─┘
//!                                                                 ▼          ▼
//!  ┌─────────────┐  ws://host/ws  ◀──────────────────────── ws frames   signals_*.csv
//!  │  Dashboard  │  GET /state · GET /health                            ticks_*.csv
//!  └─────────────┘
//! ```
//!
//! ## Environment Variables
//!
//! | Variable                 | Default                  | Description                    |
//! |--------------------------|--------------------------|--------------------------------|
//! | `BIND_ADDR`              | `0.0.0.0:3000`           | Address Axum listens on        |
//! | `TICK_SOURCE`            | `binance`                | `binance` \| `csv` \| `http`   |
//! | `CSV_FILE`               | `./data/sample.csv`      | Replay input for `csv`         |
//! | `CSV_TICK_INTERVAL_MS`   | `1000`                   | Replay pace                    |
//! | `BINANCE_WS_URL`         | btcusdt@trade stream     | Trade stream URL               |
//! | `BINANCE_RECONNECT_SECS` | `3`                      | Delay before reconnecting      |
//! | `DATA_DIR`               | `./data`                 | Recorder output directory      |
//! | `RECORD_TICKS`           | `true`                   | Write `ticks_<date>.csv`       |
//! | `RECORD_EVENTS`          | `true`                   | Write `signals_<date>.csv`     |
//! | `RUST_LOG`               | `ltp_server=debug`       | Tracing filter                 |

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod engine;
mod error;
mod events;
mod models;
mod routes;
mod sink;
mod source;
mod state;

use config::Config;
use routes::build_router;
use sink::{spawn_sink, EventRecorder, TickRecorder};
use state::build_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("ltp_server=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════╗
  ║        LTP SERVER — Signal State Machine      ║
  ║   Ticks · Signals · Condensed Crossings       ║
  ╚═══════════════════════════════════════════════╝"#);

    // ── 3. Config ─────────────────────────────────────────────────────────────
    let config = Config::from_env().context("Failed to load config")?;
    info!(
        bind     = %config.bind_addr,
        source   = %config.tick_source,
        data_dir = %config.data_dir.display(),
        "Configuration loaded"
    );

    // ── 4. Shared state ───────────────────────────────────────────────────────
    let state = build_state(config.tick_source.as_str());

    // ── 5. Sinks (subscribe before any tick can flow) ─────────────────────────
    if config.record_events {
        spawn_sink(state.subscribe_events(), EventRecorder::new(&config.data_dir));
    }
    if config.record_ticks {
        spawn_sink(state.subscribe_ticks(), TickRecorder::new(&config.data_dir));
    }

    // ── 6. Tick source ────────────────────────────────────────────────────────
    source::start(&config, state.clone()).context("Failed to start tick source")?;

    // ── 7. Router ─────────────────────────────────────────────────────────────
    let app = build_router(state);

    // ── 8. Bind & Serve ───────────────────────────────────────────────────────
    info!(addr = %config.bind_addr, "🚀 LTP server starting");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

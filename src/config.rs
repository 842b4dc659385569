//! # config — read configuration from environment variables
//!
//! `.env` is loaded by `main` via `dotenvy` before [`Config::from_env`] runs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

const DEFAULT_BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/ws/btcusdt@trade";

/// Where ticks come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSourceKind {
    /// Binance public trade stream.
    Binance,
    /// Replay of a `time,tick` CSV file, looping forever.
    Csv,
    /// No background feed; ticks arrive through `POST /tick` only.
    Http,
}

impl TickSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickSourceKind::Binance => "binance",
            TickSourceKind::Csv     => "csv",
            TickSourceKind::Http    => "http",
        }
    }
}

impl std::fmt::Display for TickSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TickSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binance" => Ok(TickSourceKind::Binance),
            "csv"     => Ok(TickSourceKind::Csv),
            "http"    => Ok(TickSourceKind::Http),
            other     => bail!("Unknown TICK_SOURCE: '{other}'. Use 'binance', 'csv' or 'http'"),
        }
    }
}

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr:         SocketAddr,
    pub tick_source:       TickSourceKind,
    /// CSV replay input, used when `tick_source` is `Csv`.
    pub csv_file:          PathBuf,
    pub csv_tick_interval: Duration,
    pub binance_ws_url:    String,
    /// Delay before reconnecting to Binance after the stream drops.
    pub binance_reconnect: Duration,
    /// Directory for `ticks_*.csv` and `signals_*.csv`.
    pub data_dir:          PathBuf,
    pub record_ticks:      bool,
    pub record_events:     bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let bind_addr = var("BIND_ADDR", "0.0.0.0:3000")
            .parse()
            .context("BIND_ADDR must be a socket address, e.g. 0.0.0.0:3000")?;

        let tick_source = var("TICK_SOURCE", "binance").parse()?;

        let csv_interval_ms: u64 = var("CSV_TICK_INTERVAL_MS", "1000")
            .parse()
            .context("CSV_TICK_INTERVAL_MS must be a number")?;

        let reconnect_secs: u64 = var("BINANCE_RECONNECT_SECS", "3")
            .parse()
            .context("BINANCE_RECONNECT_SECS must be a number")?;

        Ok(Self {
            bind_addr,
            tick_source,
            csv_file:          PathBuf::from(var("CSV_FILE", "./data/sample.csv")),
            csv_tick_interval: Duration::from_millis(csv_interval_ms.max(1)),
            binance_ws_url:    var("BINANCE_WS_URL", DEFAULT_BINANCE_WS_URL),
            binance_reconnect: Duration::from_secs(reconnect_secs),
            data_dir:          PathBuf::from(var("DATA_DIR", "./data")),
            record_ticks:      flag(get("RECORD_TICKS"), true),
            record_events:     flag(get("RECORD_EVENTS"), true),
        })
    }
}

fn flag(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
        .unwrap_or(default)
}

//! # source::csv_replay
//!
//! Replays a `time,tick` CSV file at a fixed pace, looping forever.
//!
//! ```text
//! time,tick
//! 09:15:00,67000.5
//! 09:15:01,67002.0
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use crate::models::Tick;

#[derive(Debug, Deserialize)]
struct TickRow {
    time: String,
    tick: String,
}

/// Load every row of `path`. Rows whose `tick` is not a finite number are
/// skipped; a file with no usable rows is an error.
pub fn load_ticks(path: &Path) -> anyhow::Result<Vec<Tick>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut ticks = Vec::new();
    for (index, row) in reader.deserialize::<TickRow>().enumerate() {
        let line = index + 2; // header is line 1
        let row  = row.with_context(|| format!("Malformed CSV row at line {line}"))?;

        match row.tick.parse::<f64>() {
            Ok(price) if price.is_finite() => {
                debug!(time = %row.time, price, "Loaded tick");
                ticks.push(Tick::new(price, row.time));
            }
            _ => warn!(line, tick = %row.tick, "Skipping row with non-numeric tick"),
        }
    }

    if ticks.is_empty() {
        bail!("No ticks found in {}", path.display());
    }

    info!(count = ticks.len(), file = %path.display(), "✓ Loaded ticks from file");
    Ok(ticks)
}

pub struct CsvReplay {
    ticks:    Vec<Tick>,
    interval: Duration,
}

impl CsvReplay {
    pub fn new(ticks: Vec<Tick>, interval: Duration) -> Self {
        Self { ticks, interval }
    }

    pub fn from_file(path: &Path, interval: Duration) -> anyhow::Result<Self> {
        Ok(Self::new(load_ticks(path)?, interval))
    }

    /// Emit one tick per interval, starting one interval from now. Restarts
    /// from the first row after the last.
    pub async fn run(self, tx: Sender<Tick>) -> anyhow::Result<()> {
        info!(interval = ?self.interval, "Starting CSV playback...");

        let total     = self.ticks.len();
        let mut timer = interval_at(Instant::now() + self.interval, self.interval);

        loop {
            for (index, tick) in self.ticks.iter().enumerate() {
                timer.tick().await;
                debug!(n = index + 1, total, price = tick.price, time = %tick.time, "CSV tick");

                if tx.send(tick.clone()).await.is_err() {
                    info!("Tick channel closed — stopping CSV playback");
                    return Ok(());
                }
            }

            info!("✓ All ticks played. Restarting...");
        }
    }
}

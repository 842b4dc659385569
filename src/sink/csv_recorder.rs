//! # sink::csv_recorder
//!
//! Appends ticks and condensed events to daily CSV files.
//!
//! | File                        | Header                                   |
//! |-----------------------------|------------------------------------------|
//! | `ticks_<YYYY-MM-DD>.csv`    | `date,time,tick`                         |
//! | `signals_<YYYY-MM-DD>.csv`  | `date,time,event,ltp,pnl,threshold`      |
//!
//! The header is written only when the file is created. Dates are UTC and the
//! file rolls over when the date changes.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use super::Sink;
use crate::events::CondensedEvent;
use crate::models::Tick;

const TICK_HEADERS: [&str; 3] = ["date", "time", "tick"];
const EVENT_HEADERS: [&str; 6] = ["date", "time", "event", "ltp", "pnl", "threshold"];

/// Log a progress line every N recorded ticks.
const TICK_LOG_EVERY: u64 = 1000;

// ─── Daily File ───────────────────────────────────────────────────────────────

struct DailyCsv {
    dir:     PathBuf,
    prefix:  &'static str,
    headers: &'static [&'static str],
    current: Option<(NaiveDate, csv::Writer<File>)>,
}

impl DailyCsv {
    fn new(dir: impl Into<PathBuf>, prefix: &'static str, headers: &'static [&'static str]) -> Self {
        Self { dir: dir.into(), prefix, headers, current: None }
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.prefix, date.format("%Y-%m-%d")))
    }

    fn writer_for(&mut self, date: NaiveDate) -> anyhow::Result<&mut csv::Writer<File>> {
        let stale = !matches!(&self.current, Some((d, _)) if *d == date);
        if stale {
            let path = self.path_for(date);
            self.current = Some((date, open_append(&self.dir, &path, self.headers)?));
        }

        let (_, writer) = self.current.as_mut().context("recorder file not open")?;
        Ok(writer)
    }

    fn append(&mut self, at: DateTime<Utc>, fields: &[String]) -> anyhow::Result<()> {
        let date   = at.date_naive();
        let writer = self.writer_for(date)?;

        let mut record = Vec::with_capacity(fields.len() + 2);
        record.push(date.format("%Y-%m-%d").to_string());
        record.push(at.format("%H:%M:%S").to_string());
        record.extend_from_slice(fields);

        writer.write_record(&record)?;
        writer.flush()?;
        Ok(())
    }
}

fn open_append(dir: &Path, path: &Path, headers: &[&str]) -> anyhow::Result<csv::Writer<File>> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        info!(dir = %dir.display(), "Created output directory");
    }

    let is_new = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if is_new {
        writer.write_record(headers)?;
        writer.flush()?;
        info!(file = %path.display(), "Created recorder file");
    }

    Ok(writer)
}

// ─── Event Recorder ───────────────────────────────────────────────────────────

/// Writes every condensed event to `signals_<date>.csv`.
pub struct EventRecorder {
    file: DailyCsv,
}

impl EventRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { file: DailyCsv::new(dir, "signals", &EVENT_HEADERS) }
    }
}

impl Sink<CondensedEvent> for EventRecorder {
    fn name(&self) -> &'static str {
        "event-recorder"
    }

    fn deliver(&mut self, event: &CondensedEvent) -> anyhow::Result<()> {
        self.file.append(
            event.at,
            &[
                event.kind.to_string(),
                event.ltp.to_string(),
                format!("{:.2}", event.pnl),
                event.threshold.to_string(),
            ],
        )?;

        info!(
            event = %event.kind,
            ltp   = event.ltp,
            pnl   = %format!("{:.2}", event.pnl),
            "Saved condensed event"
        );
        Ok(())
    }
}

// ─── Tick Recorder ────────────────────────────────────────────────────────────

/// Writes every tick to `ticks_<date>.csv`, stamped with the recording time.
pub struct TickRecorder {
    file:  DailyCsv,
    count: u64,
}

impl TickRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { file: DailyCsv::new(dir, "ticks", &TICK_HEADERS), count: 0 }
    }
}

impl Sink<Tick> for TickRecorder {
    fn name(&self) -> &'static str {
        "tick-recorder"
    }

    fn deliver(&mut self, tick: &Tick) -> anyhow::Result<()> {
        self.file.append(Utc::now(), &[tick.price.to_string()])?;

        self.count += 1;
        if self.count % TICK_LOG_EVERY == 0 {
            info!(count = self.count, "Saved ticks");
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use chrono::TimeZone;

    fn event_at(kind: EventKind, pnl: f64, at: DateTime<Utc>) -> CondensedEvent {
        CondensedEvent { kind, ltp: 101.0, pnl, threshold: 100, at }
    }

    #[test]
    fn test_event_rows_and_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let at  = Utc.with_ymd_and_hms(2026, 3, 4, 9, 15, 0).unwrap();

        let mut recorder = EventRecorder::new(dir.path());
        recorder.deliver(&event_at(EventKind::LtpCrossUp, 6.0, at)).unwrap();

        // A second recorder (e.g. after restart) appends without a new header.
        let mut again = EventRecorder::new(dir.path());
        again.deliver(&event_at(EventKind::PnlCrossNegative, -1.234, at)).unwrap();

        let body = fs::read_to_string(dir.path().join("signals_2026-03-04.csv")).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(
            lines,
            vec![
                "date,time,event,ltp,pnl,threshold",
                "2026-03-04,09:15:00,LTP_CROSS_UP,101,6.00,100",
                "2026-03-04,09:15:00,PNL_CROSS_NEGATIVE,101,-1.23,100",
            ]
        );
    }

    #[test]
    fn test_event_file_rolls_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let day1 = Utc.with_ymd_and_hms(2026, 3, 4, 23, 59, 59).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 1).unwrap();

        let mut recorder = EventRecorder::new(dir.path());
        recorder.deliver(&event_at(EventKind::EntrySignal, 0.0, day1)).unwrap();
        recorder.deliver(&event_at(EventKind::ExitSignal, 1.0, day2)).unwrap();

        assert!(dir.path().join("signals_2026-03-04.csv").exists());
        assert!(dir.path().join("signals_2026-03-05.csv").exists());
    }

    #[test]
    fn test_tick_recorder_creates_directory() {
        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("nested").join("data");

        let mut recorder = TickRecorder::new(&data);
        recorder.deliver(&Tick::new(67000.5, "x")).unwrap();
        recorder.deliver(&Tick::new(67001.0, "y")).unwrap();

        let file = fs::read_dir(&data).unwrap().next().unwrap().unwrap().path();
        let body = fs::read_to_string(file).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "date,time,tick");
        assert!(lines[1].ends_with(",67000.5"));
        assert!(lines[2].ends_with(",67001"));
    }
}

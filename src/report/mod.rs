//! CSV projection of detector output and the append-only sinks it goes to.
//!
//! Formatting is a pure function of the event/sample; sinks only append.

mod csv_file;

pub use csv_file::CsvFile;

use crate::clock::WallTime;
use crate::detector::{LevelStatus, SmoothedLevel, TrainEvent};
use anyhow::Result;
use chrono::SecondsFormat;

pub const EVENT_HEADER: [&str; 7] = [
    "start_time_local",
    "end_time_local",
    "duration_s",
    "avg_dbfs",
    "peak_dbfs",
    "threshold_dbfs",
    "blocks",
];

pub const LEVEL_HEADER: [&str; 5] = [
    "time_local",
    "dbfs_block",
    "dbfs_smooth",
    "threshold_dbfs",
    "status",
];

/// One consumed sample, as written to the level log.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRecord {
    pub time: WallTime,
    pub dbfs_block: f64,
    pub dbfs_smooth: f64,
    pub threshold_dbfs: f64,
    pub status: LevelStatus,
}

impl LevelRecord {
    pub fn new(
        time: WallTime,
        level: &SmoothedLevel,
        threshold_dbfs: f64,
        status: LevelStatus,
    ) -> Self {
        Self {
            time,
            dbfs_block: level.dbfs_block,
            dbfs_smooth: level.dbfs_smooth,
            threshold_dbfs,
            status,
        }
    }
}

/// Receives one record per closed event.
pub trait EventSink {
    fn write_event(&mut self, event: &TrainEvent) -> Result<()>;
}

/// Receives one record per consumed sample.
pub trait LevelSink {
    fn write_level(&mut self, record: &LevelRecord) -> Result<()>;
}

/// ISO-8601 local time with offset, second precision.
pub fn iso_seconds(time: &WallTime) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn one_decimal(value: f64) -> String {
    format!("{value:.1}")
}

pub fn event_row(event: &TrainEvent) -> [String; 7] {
    [
        iso_seconds(&event.start_wall),
        iso_seconds(&event.end_wall),
        one_decimal(event.duration_s),
        one_decimal(event.avg_dbfs),
        one_decimal(event.peak_dbfs),
        one_decimal(event.threshold_dbfs),
        event.block_count.to_string(),
    ]
}

pub fn level_row(record: &LevelRecord) -> [String; 5] {
    [
        iso_seconds(&record.time),
        one_decimal(record.dbfs_block),
        one_decimal(record.dbfs_smooth),
        one_decimal(record.threshold_dbfs),
        record.status.label().to_string(),
    ]
}

/// Human-readable one-liner for the console.
pub fn event_summary(event: &TrainEvent) -> String {
    format!(
        "Train: {} -> {}, {:.1}s, avg {:.1}, peak {:.1}",
        iso_seconds(&event.start_wall),
        iso_seconds(&event.end_wall),
        event.duration_s,
        event.avg_dbfs,
        event.peak_dbfs
    )
}

impl EventSink for CsvFile {
    fn write_event(&mut self, event: &TrainEvent) -> Result<()> {
        self.append_row(&event_row(event))
    }
}

impl LevelSink for CsvFile {
    fn write_level(&mut self, record: &LevelRecord) -> Result<()> {
        self.append_row(&level_row(record))
    }
}

impl EventSink for Vec<TrainEvent> {
    fn write_event(&mut self, event: &TrainEvent) -> Result<()> {
        self.push(event.clone());
        Ok(())
    }
}

impl LevelSink for Vec<LevelRecord> {
    fn write_level(&mut self, record: &LevelRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

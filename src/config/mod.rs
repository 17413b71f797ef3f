//! Command-line parsing, config-file overlay and validation.

mod defaults;
mod file;
mod validation;

use crate::audio::{CaptureConfig, DeviceSelector, LatencyMode, DEFAULT_QUEUE_CAPACITY};
use crate::detector::DetectorParams;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub use defaults::{
    DEFAULT_BLOCK_SIZE, DEFAULT_CHANNELS, DEFAULT_EVENTS_CSV, DEFAULT_HYSTERESIS_DB,
    DEFAULT_LATENCY, DEFAULT_LEVELS_CSV, DEFAULT_MIN_DURATION_S, DEFAULT_SAMPLE_RATE,
    DEFAULT_SMOOTHING_SEC, DEFAULT_STOP_HOLD_S, DEFAULT_THRESHOLD_DBFS,
};
pub use file::ConfigFile;

/// CLI options for trainwatch. Everything is fixed for the lifetime of the run.
#[derive(Debug, Parser, Clone)]
#[command(
    about = "Trainwatch: log sustained loud events (passing trains) from a microphone",
    author,
    version
)]
pub struct AppConfig {
    /// YAML file supplying defaults for any option not given on the command line
    #[arg(long, env = "TRAINWATCH_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Capture sample rate (Hz)
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Capture channel count; channels are averaged before measuring
    #[arg(long, default_value_t = DEFAULT_CHANNELS)]
    pub channels: u16,

    /// Frames per audio callback (0 lets the audio engine choose)
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: u32,

    /// Input latency: low, high, or a buffer length in seconds
    #[arg(long, default_value = DEFAULT_LATENCY, value_name = "low|high|SECONDS")]
    pub latency: LatencyMode,

    /// Smoothing time constant (seconds)
    #[arg(long, default_value_t = DEFAULT_SMOOTHING_SEC)]
    pub smoothing_sec: f64,

    /// Level that starts an event (dBFS)
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_DBFS, allow_negative_numbers = true)]
    pub threshold_dbfs: f64,

    /// How long the level must stay above the threshold to count (seconds)
    #[arg(long, default_value_t = DEFAULT_MIN_DURATION_S)]
    pub min_duration_s: f64,

    /// How far below the threshold an open event may dip and stay open (dB)
    #[arg(long, default_value_t = DEFAULT_HYSTERESIS_DB)]
    pub hysteresis_db: f64,

    /// Quiet time below the lower threshold that ends an event (seconds)
    #[arg(long, default_value_t = DEFAULT_STOP_HOLD_S)]
    pub stop_hold_s: f64,

    /// CSV file receiving one row per event
    #[arg(long, default_value = DEFAULT_EVENTS_CSV, value_name = "PATH")]
    pub events_csv: PathBuf,

    /// Also log every measured block to the levels CSV
    #[arg(long, default_value_t = false)]
    pub write_levels: bool,

    /// CSV file receiving one row per block when --write-levels is set
    #[arg(long, default_value = DEFAULT_LEVELS_CSV, value_name = "PATH")]
    pub levels_csv: PathBuf,

    /// Input device: index from --list-input-devices, or part of its name
    #[arg(long, value_name = "INDEX|NAME")]
    pub input_device: Option<DeviceSelector>,

    /// Depth of the capture -> detector queue (blocks)
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Print the resolved configuration as JSON and exit
    #[arg(long = "print-config", default_value_t = false)]
    pub print_config: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "TRAINWATCH_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "TRAINWATCH_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,
}

impl AppConfig {
    pub fn threshold_low_dbfs(&self) -> f64 {
        self.threshold_dbfs - self.hysteresis_db
    }

    pub fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            threshold_high_dbfs: self.threshold_dbfs,
            hysteresis_db: self.hysteresis_db,
            min_duration: seconds(self.min_duration_s),
            stop_hold: seconds(self.stop_hold_s),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            block_size: self.block_size,
            latency: self.latency,
            device: self.input_device.clone(),
            queue_capacity: self.queue_capacity,
        }
    }

    /// Resolved settings as JSON, for `--print-config`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sample_rate": self.sample_rate,
            "channels": self.channels,
            "block_size": self.block_size,
            "latency": self.latency.to_string(),
            "smoothing_sec": self.smoothing_sec,
            "threshold_dbfs": self.threshold_dbfs,
            "threshold_low_dbfs": self.threshold_low_dbfs(),
            "min_duration_s": self.min_duration_s,
            "hysteresis_db": self.hysteresis_db,
            "stop_hold_s": self.stop_hold_s,
            "events_csv": self.events_csv.display().to_string(),
            "write_levels": self.write_levels,
            "levels_csv": self.levels_csv.display().to_string(),
            "input_device": self.input_device.as_ref().map(ToString::to_string),
            "queue_capacity": self.queue_capacity,
        })
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

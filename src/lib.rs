//! Continuous loud-event detection from a live audio input.
//!
//! The CPAL callback reduces each block to one RMS value and hands it to a
//! bounded queue. A single consumer smooths the level, runs the hysteresis
//! state machine and appends finished events (and optionally every level) to
//! CSV files.

pub mod app;
pub mod audio;
pub mod clock;
pub mod config;
pub mod detector;
pub mod monitor;
pub mod report;
mod telemetry;

pub use app::{crash_log_path, init_logging, log_debug, log_file_path, log_panic};
pub use telemetry::{init_tracing, tracing_log_path};

//! Trainwatch entrypoint: listen to a microphone and log sustained loud events.
//!
//! # Architecture
//!
//! - Audio callback (CPAL thread): one RMS per block onto a bounded queue
//! - Main thread: smoothing, event detection, CSV output, operator console
//! - Signal handler: SIGINT/SIGTERM raise a stop flag the main loop polls

mod cli_utils;
mod signal;

use anyhow::{bail, Result};
use std::panic;
use std::process::ExitCode;
use trainwatch::audio::{transfer_queue, CaptureDiagnostics, Recorder};
use trainwatch::config::AppConfig;
use trainwatch::monitor::{Monitor, MonitorExit, MonitorNotice};
use trainwatch::report::{CsvFile, EVENT_HEADER, LEVEL_HEADER};
use trainwatch::{init_logging, init_tracing, log_debug, log_panic};

use crate::cli_utils::{list_input_devices, notice_line, startup_lines};
use crate::signal::{install_stop_handler, stop_flag};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log_debug(&format!("fatal: {err:#}"));
            eprintln!("[ERROR] {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        previous(info);
    }));
}

fn run() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.list_input_devices {
        return list_input_devices();
    }
    if config.print_config {
        println!("{}", serde_json::to_string_pretty(&config.to_json())?);
        return Ok(());
    }

    init_logging(&config);
    init_tracing(&config);
    install_panic_hook();
    log_debug(&format!(
        "trainwatch v{} starting: {}",
        env!("CARGO_PKG_VERSION"),
        config.to_json()
    ));

    // Open outputs first so a bad path fails before the device is claimed.
    let events = CsvFile::open_with_header(&config.events_csv, &EVENT_HEADER)?;
    let levels = if config.write_levels {
        Some(CsvFile::open_with_header(&config.levels_csv, &LEVEL_HEADER)?)
    } else {
        None
    };

    let capture = config.capture_config();
    let recorder = Recorder::open(capture.device.as_ref())?;
    let (sender, receiver) = transfer_queue(capture.queue_capacity);
    let diagnostics = CaptureDiagnostics::new();
    let stream = recorder.start(&capture, sender, diagnostics.clone())?;
    tracing::info!(
        device = %stream.resolved().device_name,
        sample_rate = stream.resolved().sample_rate,
        channels = stream.resolved().channels,
        threshold_dbfs = config.threshold_dbfs,
        "monitoring started"
    );
    for line in startup_lines(&config, &stream) {
        println!("{line}");
    }

    install_stop_handler()?;
    let mut monitor = Monitor::new(
        config.detector_params(),
        config.smoothing_sec,
        events,
        levels,
    );
    let mut notify = |notice: MonitorNotice| println!("{}", notice_line(&notice));
    let outcome = monitor.run(&receiver, &diagnostics, stop_flag(), &mut notify);
    stream.stop();

    let stats = monitor.stats();
    log_debug(&format!(
        "monitor finished: samples={} events={}",
        stats.samples, stats.events
    ));
    tracing::info!(
        samples = stats.samples,
        events = stats.events,
        "monitoring finished"
    );
    match outcome? {
        MonitorExit::Stopped => {
            println!("[INFO] Stopped by user.");
            Ok(())
        }
        MonitorExit::SourceClosed => bail!("audio stream ended unexpectedly"),
    }
}

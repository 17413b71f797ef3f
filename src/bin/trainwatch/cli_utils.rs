use anyhow::Result;
use trainwatch::audio::{CaptureStream, Recorder};
use trainwatch::config::AppConfig;
use trainwatch::report::event_summary;
use trainwatch::{detector::TrainEvent, monitor::MonitorNotice};

/// Device names, or the comma-separated `TRAINWATCH_TEST_DEVICES` override.
fn input_device_names() -> Vec<String> {
    if let Ok(raw) = std::env::var("TRAINWATCH_TEST_DEVICES") {
        return raw
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
    }
    Recorder::list_devices().unwrap_or_else(|err| {
        eprintln!("Failed to list audio input devices: {err}");
        Vec::new()
    })
}

pub(crate) fn list_input_devices() -> Result<()> {
    let devices = input_device_names();
    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for (index, name) in devices.iter().enumerate() {
            println!("  [{index}] {name}");
        }
    }
    Ok(())
}

pub(crate) fn startup_lines(config: &AppConfig, stream: &CaptureStream) -> Vec<String> {
    let resolved = stream.resolved();
    let buffer = resolved
        .buffer_frames
        .map(|frames| format!("{frames} frames"))
        .unwrap_or_else(|| "engine default".to_string());
    let mut lines = vec![
        "[INFO] Started. Press Ctrl+C to exit.".to_string(),
        format!(
            "[INFO] Threshold {:.1} dBFS (release below {:.1}), minimum {:.1}s, hysteresis {:.1} dB, stop hold {:.1}s",
            config.threshold_dbfs,
            config.threshold_low_dbfs(),
            config.min_duration_s,
            config.hysteresis_db,
            config.stop_hold_s
        ),
        format!("[INFO] Device: {}", resolved.device_name),
        format!(
            "[INFO] Stream: {} Hz, {} ch, {}, latency {}, buffer {buffer}{}",
            resolved.sample_rate,
            resolved.channels,
            resolved.sample_format,
            config.latency,
            if resolved.used_fallback {
                " (device default config)"
            } else {
                ""
            }
        ),
        format!("[INFO] Events -> {}", config.events_csv.display()),
    ];
    if config.write_levels {
        lines.push(format!("[INFO] Levels -> {}", config.levels_csv.display()));
    }
    lines
}

pub(crate) fn notice_line(notice: &MonitorNotice) -> String {
    match notice {
        MonitorNotice::Event(event) => event_line(event),
        MonitorNotice::SampleLoss(counts) => format!(
            "[WARN] Input overflows: {}, queue drops: {} (check --latency and CPU load)",
            counts.overflows, counts.dropped
        ),
    }
}

fn event_line(event: &TrainEvent) -> String {
    format!("[EVENT] {}", event_summary(event))
}

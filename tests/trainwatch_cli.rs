use std::env;
use std::fs;
use std::process::{self, Command};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn trainwatch_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_trainwatch").expect("trainwatch test binary not built")
}

fn trainwatch() -> Command {
    let mut command = Command::new(trainwatch_bin());
    command
        .env_remove("TRAINWATCH_CONFIG")
        .env_remove("TRAINWATCH_LOGS")
        .env_remove("TRAINWATCH_NO_LOGS");
    command
}

#[test]
fn trainwatch_help_mentions_name() {
    let output = trainwatch()
        .arg("--help")
        .output()
        .expect("run trainwatch --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Trainwatch"));
    assert!(combined.contains("--threshold-dbfs"));
}

#[test]
fn trainwatch_print_config_emits_json() {
    let output = trainwatch()
        .args(["--print-config", "--threshold-dbfs", "-20", "--latency", "low"])
        .output()
        .expect("run trainwatch --print-config");
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("print-config output is JSON");
    assert_eq!(value["threshold_dbfs"], -20.0);
    assert_eq!(value["threshold_low_dbfs"], -22.0);
    assert_eq!(value["latency"], "low");
    assert_eq!(value["events_csv"], "train_events.csv");
}

#[test]
fn trainwatch_print_config_reads_yaml_file() {
    let path = env::temp_dir().join(format!("trainwatch_cli_{}.yaml", process::id()));
    fs::write(&path, "min_duration_s: 12\nstop_hold_s: 2.5\n").expect("write config");
    let output = trainwatch()
        .arg("--config")
        .arg(&path)
        .args(["--stop-hold-s", "4", "--print-config"])
        .output()
        .expect("run trainwatch --config");
    let _ = fs::remove_file(&path);
    assert!(output.status.success(), "{}", combined_output(&output));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("print-config output is JSON");
    assert_eq!(value["min_duration_s"], 12.0);
    assert_eq!(value["stop_hold_s"], 4.0);
}

#[test]
fn trainwatch_rejects_out_of_range_threshold() {
    let output = trainwatch()
        .args(["--threshold-dbfs", "6", "--print-config"])
        .output()
        .expect("run trainwatch with bad threshold");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("[ERROR]"));
    assert!(combined.contains("--threshold-dbfs"));
}

#[test]
fn trainwatch_list_input_devices_uses_override() {
    let output = trainwatch()
        .arg("--list-input-devices")
        .env("TRAINWATCH_TEST_DEVICES", "Built-in Microphone, USB Audio")
        .output()
        .expect("run trainwatch --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Available audio input devices:"));
    assert!(combined.contains("[0] Built-in Microphone"));
    assert!(combined.contains("[1] USB Audio"));
}

#[test]
fn trainwatch_list_input_devices_handles_none() {
    let output = trainwatch()
        .arg("--list-input-devices")
        .env("TRAINWATCH_TEST_DEVICES", "")
        .output()
        .expect("run trainwatch --list-input-devices");
    assert!(output.status.success());
    assert!(combined_output(&output).contains("No audio input devices detected."));
}

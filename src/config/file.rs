use super::AppConfig;
use crate::audio::{DeviceSelector, LatencyMode};
use anyhow::{Context, Result};
use clap::parser::ValueSource;
use clap::ArgMatches;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Options read from `--config`. Every key is optional; keys given on the
/// command line or through the environment take precedence.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub block_size: Option<u32>,
    pub latency: Option<Scalar>,
    pub smoothing_sec: Option<f64>,
    pub threshold_dbfs: Option<f64>,
    pub min_duration_s: Option<f64>,
    pub hysteresis_db: Option<f64>,
    pub stop_hold_s: Option<f64>,
    pub events_csv: Option<PathBuf>,
    pub write_levels: Option<bool>,
    pub levels_csv: Option<PathBuf>,
    pub input_device: Option<Scalar>,
    pub queue_capacity: Option<usize>,
}

/// A YAML scalar that may be written as a number or a word
/// (`latency: 0.3` vs `latency: high`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn as_text(&self) -> String {
        match self {
            Scalar::Number(value) => value.to_string(),
            Scalar::Text(text) => text.clone(),
        }
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_yaml(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Copy file values into `config` for every option the user did not set
    /// explicitly.
    pub fn apply(&self, config: &mut AppConfig, matches: &ArgMatches) -> Result<()> {
        let fill = |id: &str| !explicit(matches, id);

        if fill("sample_rate") {
            overlay(&mut config.sample_rate, self.sample_rate);
        }
        if fill("channels") {
            overlay(&mut config.channels, self.channels);
        }
        if fill("block_size") {
            overlay(&mut config.block_size, self.block_size);
        }
        if fill("latency") {
            if let Some(latency) = &self.latency {
                config.latency = latency
                    .as_text()
                    .parse::<LatencyMode>()
                    .context("latency")?;
            }
        }
        if fill("smoothing_sec") {
            overlay(&mut config.smoothing_sec, self.smoothing_sec);
        }
        if fill("threshold_dbfs") {
            overlay(&mut config.threshold_dbfs, self.threshold_dbfs);
        }
        if fill("min_duration_s") {
            overlay(&mut config.min_duration_s, self.min_duration_s);
        }
        if fill("hysteresis_db") {
            overlay(&mut config.hysteresis_db, self.hysteresis_db);
        }
        if fill("stop_hold_s") {
            overlay(&mut config.stop_hold_s, self.stop_hold_s);
        }
        if fill("events_csv") {
            overlay(&mut config.events_csv, self.events_csv.clone());
        }
        if fill("write_levels") {
            overlay(&mut config.write_levels, self.write_levels);
        }
        if fill("levels_csv") {
            overlay(&mut config.levels_csv, self.levels_csv.clone());
        }
        if fill("input_device") {
            if let Some(device) = &self.input_device {
                config.input_device = Some(
                    device
                        .as_text()
                        .parse::<DeviceSelector>()
                        .context("input_device")?,
                );
            }
        }
        if fill("queue_capacity") {
            overlay(&mut config.queue_capacity, self.queue_capacity);
        }
        Ok(())
    }
}

fn explicit(matches: &ArgMatches, id: &str) -> bool {
    matches!(
        matches.value_source(id),
        Some(ValueSource::CommandLine) | Some(ValueSource::EnvVariable)
    )
}

fn overlay<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

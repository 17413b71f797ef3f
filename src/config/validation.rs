use super::defaults::{
    MAX_BLOCK_SIZE, MAX_CHANNELS, MAX_HYSTERESIS_DB, MAX_MIN_DURATION_S, MAX_QUEUE_CAPACITY,
    MAX_SAMPLE_RATE, MAX_SMOOTHING_SEC, MAX_STOP_HOLD_S, MIN_QUEUE_CAPACITY, MIN_SAMPLE_RATE,
    MIN_THRESHOLD_DBFS,
};
use super::{AppConfig, ConfigFile};
use anyhow::{bail, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use std::ffi::OsString;

impl AppConfig {
    /// Parse process arguments, apply `--config`, and validate.
    ///
    /// `--help`, `--version` and usage errors exit the process, as with
    /// `Parser::parse`.
    pub fn parse_args() -> Result<Self> {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches)
    }

    /// Same as [`AppConfig::parse_args`] for an explicit argument list, returning
    /// usage errors instead of exiting.
    pub fn try_parse_args_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = Self::from_arg_matches(matches)?;
        if let Some(path) = config.config.clone() {
            ConfigFile::load(&path)?.apply(&mut config, matches)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }
        if !(1..=MAX_CHANNELS).contains(&self.channels) {
            bail!(
                "--channels must be between 1 and {MAX_CHANNELS}, got {}",
                self.channels
            );
        }
        if self.block_size > MAX_BLOCK_SIZE {
            bail!(
                "--block-size must be between 0 and {MAX_BLOCK_SIZE} frames, got {}",
                self.block_size
            );
        }
        if !self.smoothing_sec.is_finite()
            || self.smoothing_sec <= 0.0
            || self.smoothing_sec > MAX_SMOOTHING_SEC
        {
            bail!(
                "--smoothing-sec must be in (0, {MAX_SMOOTHING_SEC}] seconds, got {}",
                self.smoothing_sec
            );
        }
        if !(MIN_THRESHOLD_DBFS..=0.0).contains(&self.threshold_dbfs) {
            bail!(
                "--threshold-dbfs must be between {MIN_THRESHOLD_DBFS} and 0.0 dBFS, got {}",
                self.threshold_dbfs
            );
        }
        if !(0.0..=MAX_MIN_DURATION_S).contains(&self.min_duration_s) {
            bail!(
                "--min-duration-s must be between 0 and {MAX_MIN_DURATION_S} seconds, got {}",
                self.min_duration_s
            );
        }
        if !(0.0..=MAX_HYSTERESIS_DB).contains(&self.hysteresis_db) {
            bail!(
                "--hysteresis-db must be between 0 and {MAX_HYSTERESIS_DB} dB, got {}",
                self.hysteresis_db
            );
        }
        if !(0.0..=MAX_STOP_HOLD_S).contains(&self.stop_hold_s) {
            bail!(
                "--stop-hold-s must be between 0 and {MAX_STOP_HOLD_S} seconds, got {}",
                self.stop_hold_s
            );
        }
        if !(MIN_QUEUE_CAPACITY..=MAX_QUEUE_CAPACITY).contains(&self.queue_capacity) {
            bail!(
                "--queue-capacity must be between {MIN_QUEUE_CAPACITY} and {MAX_QUEUE_CAPACITY}, got {}",
                self.queue_capacity
            );
        }
        if self.events_csv.as_os_str().is_empty() {
            bail!("--events-csv must not be empty");
        }
        if self.write_levels {
            if self.levels_csv.as_os_str().is_empty() {
                bail!("--levels-csv must not be empty when --write-levels is set");
            }
            if self.levels_csv == self.events_csv {
                bail!(
                    "--levels-csv and --events-csv must be different files ('{}')",
                    self.events_csv.display()
                );
            }
        }
        Ok(())
    }
}

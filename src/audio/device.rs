use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::str::FromStr;

/// Buffer length used for `--latency high` when no block size is forced.
pub const HIGH_LATENCY_S: f64 = 0.2;
/// Largest latency accepted as an explicit number of seconds.
pub const MAX_LATENCY_S: f64 = 10.0;

/// How much buffering to ask the audio engine for.
///
/// Higher latency means larger device buffers, which trades responsiveness for
/// fewer input overflows on a loaded machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LatencyMode {
    Low,
    #[default]
    High,
    Seconds(f64),
}

impl LatencyMode {
    /// Target buffer duration, or `None` to let the engine choose.
    pub fn seconds(self) -> Option<f64> {
        match self {
            LatencyMode::Low => None,
            LatencyMode::High => Some(HIGH_LATENCY_S),
            LatencyMode::Seconds(secs) => Some(secs),
        }
    }
}

impl fmt::Display for LatencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencyMode::Low => f.write_str("low"),
            LatencyMode::High => f.write_str("high"),
            LatencyMode::Seconds(secs) => write!(f, "{secs}"),
        }
    }
}

impl FromStr for LatencyMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "low" => return Ok(LatencyMode::Low),
            "high" => return Ok(LatencyMode::High),
            _ => {}
        }
        let secs: f64 = trimmed
            .parse()
            .map_err(|_| anyhow!("latency must be 'low', 'high' or seconds, got '{raw}'"))?;
        if !secs.is_finite() || secs <= 0.0 || secs > MAX_LATENCY_S {
            bail!("latency seconds must be in (0, {MAX_LATENCY_S}], got {secs}");
        }
        Ok(LatencyMode::Seconds(secs))
    }
}

/// Which input device to open: an index into the input device list, or a
/// case-insensitive fragment of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    Index(usize),
    NameContains(String),
}

impl DeviceSelector {
    /// Position of the first device this selector matches.
    pub fn find_in<S: AsRef<str>>(&self, names: &[S]) -> Option<usize> {
        match self {
            DeviceSelector::Index(index) => (*index < names.len()).then_some(*index),
            DeviceSelector::NameContains(fragment) => {
                let needle = fragment.to_lowercase();
                names
                    .iter()
                    .position(|name| name.as_ref().to_lowercase().contains(&needle))
            }
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Index(index) => write!(f, "{index}"),
            DeviceSelector::NameContains(fragment) => f.write_str(fragment),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("input device selector cannot be empty");
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            let index = trimmed
                .parse()
                .map_err(|_| anyhow!("input device index '{trimmed}' is out of range"))?;
            return Ok(DeviceSelector::Index(index));
        }
        Ok(DeviceSelector::NameContains(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_latency_modes() {
        assert_eq!("low".parse::<LatencyMode>().ok(), Some(LatencyMode::Low));
        assert_eq!("HIGH".parse::<LatencyMode>().ok(), Some(LatencyMode::High));
        assert_eq!(
            "0.35".parse::<LatencyMode>().ok(),
            Some(LatencyMode::Seconds(0.35))
        );
    }

    #[test]
    fn rejects_bad_latency() {
        for raw in ["", "medium", "0", "-0.1", "11", "NaN"] {
            assert!(raw.parse::<LatencyMode>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn latency_seconds() {
        assert_eq!(LatencyMode::Low.seconds(), None);
        assert_eq!(LatencyMode::High.seconds(), Some(HIGH_LATENCY_S));
        assert_eq!(LatencyMode::Seconds(0.5).seconds(), Some(0.5));
    }

    #[test]
    fn digits_select_by_index() {
        assert_eq!(
            "2".parse::<DeviceSelector>().ok(),
            Some(DeviceSelector::Index(2))
        );
        assert_eq!(
            "USB Mic".parse::<DeviceSelector>().ok(),
            Some(DeviceSelector::NameContains("USB Mic".to_string()))
        );
        assert!("  ".parse::<DeviceSelector>().is_err());
    }

    #[test]
    fn name_fragment_matches_case_insensitively() {
        let names = ["Built-in Microphone", "USB Audio CODEC", "BlackHole 2ch"];
        let selector = DeviceSelector::NameContains("usb".to_string());
        assert_eq!(selector.find_in(&names), Some(1));
        let missing = DeviceSelector::NameContains("scarlett".to_string());
        assert_eq!(missing.find_in(&names), None);
    }

    #[test]
    fn index_must_be_in_range() {
        let names = ["a", "b"];
        assert_eq!(DeviceSelector::Index(1).find_in(&names), Some(1));
        assert_eq!(DeviceSelector::Index(2).find_in(&names), None);
    }
}

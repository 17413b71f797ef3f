//! Block-size independent exponential smoothing of loudness.

use crate::audio::{dbfs_from_rms, sanitize_rms};

/// Time constants below this are treated as this value.
pub const MIN_TIME_CONSTANT_S: f64 = 0.5;
const MIN_ALPHA: f64 = 0.001;
const MAX_ALPHA: f64 = 1.0;

/// Smoothing factor for one block, scaled by how long the block was.
///
/// Scaling by block duration keeps the effective time constant roughly the
/// same whatever buffer size the audio engine picks.
pub fn smoothing_alpha(block_duration_s: f64, time_constant_s: f64) -> f64 {
    let block = if block_duration_s.is_finite() && block_duration_s > 0.0 {
        block_duration_s
    } else {
        0.0
    };
    let tau = if time_constant_s.is_finite() {
        time_constant_s.max(MIN_TIME_CONSTANT_S)
    } else {
        MIN_TIME_CONSTANT_S
    };
    (block / tau).clamp(MIN_ALPHA, MAX_ALPHA)
}

/// Next EMA value. The first sample seeds the average directly.
pub fn next_ema(
    previous: Option<f64>,
    rms: f64,
    block_duration_s: f64,
    time_constant_s: f64,
) -> f64 {
    let rms = sanitize_rms(rms);
    match previous {
        None => rms,
        Some(prev) => {
            let alpha = smoothing_alpha(block_duration_s, time_constant_s);
            (1.0 - alpha) * prev + alpha * rms
        }
    }
}

/// Block and smoothed levels for one consumed sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedLevel {
    pub ema_rms: f64,
    pub dbfs_block: f64,
    pub dbfs_smooth: f64,
}

/// Owns the running EMA.
#[derive(Debug, Clone)]
pub struct Smoother {
    time_constant_s: f64,
    ema_rms: Option<f64>,
}

impl Smoother {
    pub fn new(time_constant_s: f64) -> Self {
        Self {
            time_constant_s,
            ema_rms: None,
        }
    }

    pub fn update(&mut self, rms: f64, block_duration_s: f64) -> SmoothedLevel {
        let ema_rms = next_ema(self.ema_rms, rms, block_duration_s, self.time_constant_s);
        self.ema_rms = Some(ema_rms);
        SmoothedLevel {
            ema_rms,
            dbfs_block: dbfs_from_rms(rms),
            dbfs_smooth: dbfs_from_rms(ema_rms),
        }
    }
}

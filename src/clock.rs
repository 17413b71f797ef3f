//! Dual-clock timestamps.
//!
//! Wall time is only carried for reporting. Every duration comparison in the
//! detector goes through [`MonoTime`], which cannot jump when NTP or DST moves
//! the system clock.
//!
//! The audio callback stamps raw [`SystemTime`] only. Resolving the local
//! offset reads timezone state and may allocate, so [`wall_time`] runs on the
//! consumer side.

use chrono::{DateTime, FixedOffset, Local};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime};

/// Local wall-clock time with its UTC offset, as written to the CSV logs.
pub type WallTime = DateTime<FixedOffset>;

static MONO_ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Monotonic instant measured from a process-wide origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MonoTime(Duration);

impl MonoTime {
    pub fn now() -> Self {
        let origin = MONO_ORIGIN.get_or_init(Instant::now);
        Self(origin.elapsed())
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_default())
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Time elapsed since `earlier`, zero if `earlier` is not actually earlier.
    pub fn saturating_since(self, earlier: MonoTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// Local time with offset for a raw system timestamp.
pub fn wall_time(system: SystemTime) -> WallTime {
    DateTime::<Local>::from(system).fixed_offset()
}

/// When a block arrived, on both clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedAt {
    pub wall: SystemTime,
    pub mono: MonoTime,
}

impl CapturedAt {
    /// Two plain clock reads; safe to call from the audio callback.
    pub fn now() -> Self {
        Self {
            wall: SystemTime::now(),
            mono: MonoTime::now(),
        }
    }

    pub fn wall_time(&self) -> WallTime {
        wall_time(self.wall)
    }
}

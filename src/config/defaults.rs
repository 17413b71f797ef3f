pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: u16 = 1;
pub const DEFAULT_BLOCK_SIZE: u32 = 0;
pub const DEFAULT_LATENCY: &str = "high";
pub const DEFAULT_SMOOTHING_SEC: f64 = 3.0;
pub const DEFAULT_THRESHOLD_DBFS: f64 = -15.0;
pub const DEFAULT_MIN_DURATION_S: f64 = 30.0;
pub const DEFAULT_HYSTERESIS_DB: f64 = 2.0;
pub const DEFAULT_STOP_HOLD_S: f64 = 5.0;
pub const DEFAULT_EVENTS_CSV: &str = "train_events.csv";
pub const DEFAULT_LEVELS_CSV: &str = "noise_levels.csv";

pub(super) const MIN_SAMPLE_RATE: u32 = 8_000;
pub(super) const MAX_SAMPLE_RATE: u32 = 192_000;
pub(super) const MAX_CHANNELS: u16 = 32;
pub(super) const MAX_BLOCK_SIZE: u32 = 65_536;
pub(super) const MAX_SMOOTHING_SEC: f64 = 600.0;
pub(super) const MIN_THRESHOLD_DBFS: f64 = -120.0;
pub(super) const MAX_MIN_DURATION_S: f64 = 86_400.0;
pub(super) const MAX_HYSTERESIS_DB: f64 = 60.0;
pub(super) const MAX_STOP_HOLD_S: f64 = 3_600.0;
pub(super) const MIN_QUEUE_CAPACITY: usize = 8;
pub(super) const MAX_QUEUE_CAPACITY: usize = 100_000;

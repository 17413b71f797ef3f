//! Level smoothing and the loud-event state machine.
//!
//! Everything here is synchronous and clock-agnostic: callers pass the
//! timestamps in, so scripted sample sequences drive it deterministically.

mod machine;
mod smoothing;

pub use machine::{
    DetectorParams, DetectorPhase, DetectorStep, EventAccumulator, EventDetector, LevelStatus,
    TrainEvent,
};
pub use smoothing::{next_ema, smoothing_alpha, SmoothedLevel, Smoother, MIN_TIME_CONSTANT_S};

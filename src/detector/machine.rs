//! Hysteresis event detector.
//!
//! Tracks one loud excursion at a time: it becomes a candidate once the
//! smoothed level reaches the high threshold, is confirmed after staying there
//! for the minimum duration, and is closed once the level has stayed below the
//! low threshold for the stop-hold time.

use super::smoothing::SmoothedLevel;
use crate::audio::{dbfs_from_rms, RMS_EPSILON};
use crate::clock::{wall_time, CapturedAt, MonoTime, WallTime};
use std::time::Duration;

/// Thresholds and timings for the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    pub threshold_high_dbfs: f64,
    pub hysteresis_db: f64,
    pub min_duration: Duration,
    pub stop_hold: Duration,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            threshold_high_dbfs: -15.0,
            hysteresis_db: 2.0,
            min_duration: Duration::from_secs(30),
            stop_hold: Duration::from_secs(5),
        }
    }
}

impl DetectorParams {
    pub fn threshold_low_dbfs(&self) -> f64 {
        self.threshold_high_dbfs - self.hysteresis_db
    }
}

/// Coarse detector state, for logs and the level record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    Idle,
    Candidate,
    Active,
}

impl DetectorPhase {
    pub fn label(self) -> &'static str {
        match self {
            DetectorPhase::Idle => "idle",
            DetectorPhase::Candidate => "candidate",
            DetectorPhase::Active => "active",
        }
    }
}

/// Status column of the level log. Candidates still report `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStatus {
    Idle,
    TrainActive,
}

impl LevelStatus {
    pub fn label(self) -> &'static str {
        match self {
            LevelStatus::Idle => "idle",
            LevelStatus::TrainActive => "train_active",
        }
    }
}

/// A confirmed and closed loud event.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainEvent {
    pub start_wall: WallTime,
    pub end_wall: WallTime,
    pub duration_s: f64,
    pub avg_dbfs: f64,
    pub peak_dbfs: f64,
    pub threshold_dbfs: f64,
    pub block_count: u64,
}

/// Running statistics of an open event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventAccumulator {
    start: CapturedAt,
    last_above: MonoTime,
    block_count: u64,
    sum_ema_rms: f64,
    peak_ema_rms: f64,
}

impl EventAccumulator {
    fn open(start: CapturedAt, now: MonoTime) -> Self {
        Self {
            start,
            last_above: now,
            block_count: 0,
            sum_ema_rms: 0.0,
            peak_ema_rms: 0.0,
        }
    }

    fn add(&mut self, ema_rms: f64) {
        self.block_count = self.block_count.saturating_add(1);
        self.sum_ema_rms += ema_rms;
        if ema_rms > self.peak_ema_rms {
            self.peak_ema_rms = ema_rms;
        }
    }

    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    pub fn started_at(&self) -> CapturedAt {
        self.start
    }

    fn close(self, end: CapturedAt, threshold_dbfs: f64) -> TrainEvent {
        let elapsed = end.mono.saturating_since(self.start.mono);
        let peak_rms = self.peak_ema_rms.max(RMS_EPSILON);
        // Float summation can push the mean a hair above the peak.
        let avg_rms = (self.sum_ema_rms / self.block_count.max(1) as f64).min(peak_rms);
        let end_wall = if end.wall > self.start.wall {
            end.wall
        } else {
            self.start.wall.checked_add(elapsed).unwrap_or(self.start.wall)
        };
        TrainEvent {
            start_wall: self.start.wall_time(),
            end_wall: wall_time(end_wall),
            duration_s: elapsed.as_secs_f64(),
            avg_dbfs: dbfs_from_rms(avg_rms),
            peak_dbfs: dbfs_from_rms(peak_rms),
            threshold_dbfs,
            block_count: self.block_count,
        }
    }
}

/// Result of feeding one sample to the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorStep {
    pub status: LevelStatus,
    pub closed: Option<TrainEvent>,
}

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Idle,
    Candidate(CapturedAt),
    Active(EventAccumulator),
}

/// Owns the detector state. Only the monitor loop touches it.
#[derive(Debug, Clone)]
pub struct EventDetector {
    params: DetectorParams,
    state: State,
}

impl EventDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self {
            params,
            state: State::Idle,
        }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn phase(&self) -> DetectorPhase {
        match self.state {
            State::Idle => DetectorPhase::Idle,
            State::Candidate(_) => DetectorPhase::Candidate,
            State::Active(_) => DetectorPhase::Active,
        }
    }

    /// The open event, if one is confirmed.
    pub fn open_event(&self) -> Option<&EventAccumulator> {
        match &self.state {
            State::Active(acc) => Some(acc),
            _ => None,
        }
    }

    /// Drop any candidate or open event without emitting it.
    pub fn discard(&mut self) -> DetectorPhase {
        let phase = self.phase();
        self.state = State::Idle;
        phase
    }

    /// Advance the state machine by one smoothed sample taken at `at`.
    pub fn process(&mut self, level: &SmoothedLevel, at: CapturedAt) -> DetectorStep {
        let above_high = level.dbfs_smooth >= self.params.threshold_high_dbfs;
        let (next, step) = match std::mem::take(&mut self.state) {
            State::Idle if above_high => {
                tracing::debug!(dbfs = level.dbfs_smooth, "candidate excursion started");
                self.confirm_or_wait(at, at)
            }
            State::Idle => (State::Idle, idle_step()),
            State::Candidate(since) if above_high => self.confirm_or_wait(since, at),
            State::Candidate(since) => {
                tracing::debug!(
                    held_s = at.mono.saturating_since(since.mono).as_secs_f64(),
                    "candidate excursion reset"
                );
                (State::Idle, idle_step())
            }
            State::Active(acc) => self.advance_active(acc, level, at),
        };
        self.state = next;
        step
    }

    fn confirm_or_wait(&self, since: CapturedAt, at: CapturedAt) -> (State, DetectorStep) {
        if at.mono.saturating_since(since.mono) >= self.params.min_duration {
            tracing::info!(start = %since.wall_time(), "event confirmed");
            let step = DetectorStep {
                status: LevelStatus::TrainActive,
                closed: None,
            };
            (State::Active(EventAccumulator::open(since, at.mono)), step)
        } else {
            (State::Candidate(since), idle_step())
        }
    }

    fn advance_active(
        &self,
        mut acc: EventAccumulator,
        level: &SmoothedLevel,
        at: CapturedAt,
    ) -> (State, DetectorStep) {
        acc.add(level.ema_rms);
        if level.dbfs_smooth >= self.params.threshold_low_dbfs() {
            acc.last_above = at.mono;
        }

        if at.mono.saturating_since(acc.last_above) >= self.params.stop_hold {
            let event = acc.close(at, self.params.threshold_high_dbfs);
            tracing::info!(
                start = %event.start_wall,
                end = %event.end_wall,
                duration_s = event.duration_s,
                avg_dbfs = event.avg_dbfs,
                peak_dbfs = event.peak_dbfs,
                blocks = event.block_count,
                "event closed"
            );
            let step = DetectorStep {
                status: LevelStatus::Idle,
                closed: Some(event),
            };
            return (State::Idle, step);
        }

        let step = DetectorStep {
            status: LevelStatus::TrainActive,
            closed: None,
        };
        (State::Active(acc), step)
    }
}

fn idle_step() -> DetectorStep {
    DetectorStep {
        status: LevelStatus::Idle,
        closed: None,
    }
}

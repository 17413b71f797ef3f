//! Consumer side of the transfer queue.
//!
//! Pulls loudness samples with a bounded wait, runs them through smoothing and
//! the event detector, and hands closed events and per-sample levels to the
//! sinks. All detector state lives here and is never shared.

#[cfg(test)]
mod tests;

use crate::audio::{CaptureDiagnostics, DiagnosticCounts, LoudnessSample};
use crate::detector::{DetectorParams, DetectorPhase, EventDetector, Smoother, TrainEvent};
use crate::log_debug;
use crate::report::{EventSink, LevelRecord, LevelSink};
use anyhow::{bail, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest the loop waits for a sample before doing housekeeping.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(1);
/// Minimum spacing between sample-loss reports.
pub const LOSS_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Something the operator should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorNotice {
    Event(TrainEvent),
    SampleLoss(DiagnosticCounts),
}

/// Why [`Monitor::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// The stop flag was raised.
    Stopped,
    /// Every sender is gone; the capture stream ended.
    SourceClosed,
}

/// Running totals, for the shutdown summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub samples: u64,
    pub events: u64,
}

pub struct Monitor<E, L> {
    smoother: Smoother,
    detector: EventDetector,
    events: E,
    levels: Option<L>,
    stats: MonitorStats,
    poll_timeout: Duration,
    report_interval: Duration,
}

impl<E: EventSink, L: LevelSink> Monitor<E, L> {
    pub fn new(
        params: DetectorParams,
        smoothing_time_constant_s: f64,
        events: E,
        levels: Option<L>,
    ) -> Self {
        Self {
            smoother: Smoother::new(smoothing_time_constant_s),
            detector: EventDetector::new(params),
            events,
            levels,
            stats: MonitorStats::default(),
            poll_timeout: POLL_TIMEOUT,
            report_interval: LOSS_REPORT_INTERVAL,
        }
    }

    /// Override the poll timeout and loss-report spacing.
    pub fn with_intervals(mut self, poll_timeout: Duration, report_interval: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self.report_interval = report_interval;
        self
    }

    pub fn phase(&self) -> DetectorPhase {
        self.detector.phase()
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    pub fn event_sink(&self) -> &E {
        &self.events
    }

    pub fn level_sink(&self) -> Option<&L> {
        self.levels.as_ref()
    }

    /// Consume one sample. Returns the event it closed, if any.
    ///
    /// A sink error is returned as-is; the caller should treat it as fatal.
    pub fn process_sample(&mut self, sample: &LoudnessSample) -> Result<Option<TrainEvent>> {
        let level = self
            .smoother
            .update(sample.rms, sample.block_duration_s);
        let step = self.detector.process(&level, sample.captured_at);
        self.stats.samples = self.stats.samples.saturating_add(1);

        if let Some(event) = &step.closed {
            self.events.write_event(event)?;
            self.stats.events = self.stats.events.saturating_add(1);
        }
        if let Some(levels) = self.levels.as_mut() {
            let record = LevelRecord::new(
                sample.captured_at.wall_time(),
                &level,
                self.detector.params().threshold_high_dbfs,
                step.status,
            );
            levels.write_level(&record)?;
        }
        Ok(step.closed)
    }

    /// Drive the detector until `stop` is raised or the source goes away.
    ///
    /// Waits at most the poll timeout for each sample so sample-loss reports
    /// and device-loss checks still happen while the input is silent. Any
    /// candidate or open event is discarded on exit.
    pub fn run(
        &mut self,
        receiver: &Receiver<LoudnessSample>,
        diagnostics: &CaptureDiagnostics,
        stop: &AtomicBool,
        notify: &mut dyn FnMut(MonitorNotice),
    ) -> Result<MonitorExit> {
        let mut last_report = Instant::now();
        let exit = loop {
            if stop.load(Ordering::Relaxed) {
                break MonitorExit::Stopped;
            }
            if diagnostics.device_lost() {
                self.discard_pending();
                bail!("audio input device is no longer available");
            }
            if last_report.elapsed() >= self.report_interval {
                let counts = diagnostics.take();
                if !counts.is_empty() {
                    tracing::warn!(
                        overflows = counts.overflows,
                        dropped = counts.dropped,
                        "input samples lost"
                    );
                    log_debug(&format!(
                        "input overflows={} dropped={}",
                        counts.overflows, counts.dropped
                    ));
                    notify(MonitorNotice::SampleLoss(counts));
                }
                last_report = Instant::now();
            }

            match receiver.recv_timeout(self.poll_timeout) {
                Ok(sample) => {
                    if let Some(event) = self.process_sample(&sample)? {
                        notify(MonitorNotice::Event(event));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break MonitorExit::SourceClosed,
            }
        };
        self.discard_pending();
        Ok(exit)
    }

    fn discard_pending(&mut self) {
        let phase = self.detector.discard();
        if phase != DetectorPhase::Idle {
            log_debug(&format!("discarding {} excursion at shutdown", phase.label()));
            tracing::debug!(phase = phase.label(), "pending excursion discarded");
        }
    }
}

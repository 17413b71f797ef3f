use crate::clock::CapturedAt;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

/// Default depth of the callback -> monitor queue, in blocks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// One loudness measurement per captured block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessSample {
    pub rms: f64,
    pub block_duration_s: f64,
    pub captured_at: CapturedAt,
}

/// Bounded single-producer/single-consumer channel for loudness samples.
///
/// The producer side only ever uses `try_send`, so a full queue drops the
/// newest sample instead of blocking the audio callback.
pub fn transfer_queue(capacity: usize) -> (Sender<LoudnessSample>, Receiver<LoudnessSample>) {
    bounded(capacity.max(1))
}

/// Counters shared between the audio callback and the monitor loop.
///
/// Approximate by nature: the callback bumps them with relaxed atomics and the
/// monitor drains them periodically for operator diagnostics. Nothing in the
/// detection path reads them.
#[derive(Clone, Debug, Default)]
pub struct CaptureDiagnostics {
    overflows: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
    device_lost: Arc<AtomicBool>,
}

/// Snapshot returned by [`CaptureDiagnostics::take`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticCounts {
    /// Overflows reported by the capture source.
    pub overflows: usize,
    /// Samples dropped because the transfer queue was full.
    pub dropped: usize,
}

impl DiagnosticCounts {
    pub fn is_empty(&self) -> bool {
        self.overflows == 0 && self.dropped == 0
    }
}

impl CaptureDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_overflow(&self) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_device_lost(&self) {
        self.device_lost.store(true, Ordering::Relaxed);
    }

    pub fn device_lost(&self) -> bool {
        self.device_lost.load(Ordering::Relaxed)
    }

    /// Read the counters without resetting them.
    pub fn peek(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            overflows: self.overflows.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Read and reset both counters.
    pub fn take(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            overflows: self.overflows.swap(0, Ordering::Relaxed),
            dropped: self.dropped.swap(0, Ordering::Relaxed),
        }
    }
}

//! Audio capture side of the pipeline.
//!
//! The CPAL callback reduces each block to one RMS value and pushes it onto a
//! bounded queue without blocking. Overflows and queue drops are only counted.

mod device;
mod level;
mod producer;
mod queue;
mod recorder;

pub use device::{DeviceSelector, LatencyMode, HIGH_LATENCY_S, MAX_LATENCY_S};
pub use level::{block_rms, dbfs_from_rms, rms_from_dbfs, sanitize_rms, RMS_EPSILON};
pub use producer::{BlockProducer, PushOutcome};
pub use queue::{
    transfer_queue, CaptureDiagnostics, DiagnosticCounts, LoudnessSample, DEFAULT_QUEUE_CAPACITY,
};
pub use recorder::{requested_buffer_frames, CaptureConfig, CaptureStream, Recorder, ResolvedStream};

use super::level::block_rms;
use super::queue::{CaptureDiagnostics, LoudnessSample};
use crate::clock::CapturedAt;
use crossbeam_channel::{Sender, TrySendError};

/// What happened to a block handed to [`BlockProducer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queue was full; the sample was discarded.
    Dropped,
    /// The block held no frames.
    Empty,
    /// The monitor side has gone away.
    Disconnected,
}

/// Turns raw callback blocks into loudness samples on the transfer queue.
///
/// Lives inside the audio callback: every call does one O(block) RMS pass and
/// at most one `try_send`, never blocks and never allocates.
pub struct BlockProducer {
    sender: Sender<LoudnessSample>,
    sample_rate: u32,
    channels: usize,
    diagnostics: CaptureDiagnostics,
}

impl BlockProducer {
    pub fn new(
        sender: Sender<LoudnessSample>,
        sample_rate: u32,
        channels: usize,
        diagnostics: CaptureDiagnostics,
    ) -> Self {
        Self {
            sender,
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
            diagnostics,
        }
    }

    pub fn push_block<T, F>(&self, data: &[T], overflow: bool, convert: F) -> PushOutcome
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.push_block_at(data, overflow, CapturedAt::now(), convert)
    }

    pub fn push_block_at<T, F>(
        &self,
        data: &[T],
        overflow: bool,
        captured_at: CapturedAt,
        convert: F,
    ) -> PushOutcome
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        if overflow {
            self.diagnostics.record_overflow();
        }

        let (rms, frames) = block_rms(data, self.channels, convert);
        if frames == 0 {
            return PushOutcome::Empty;
        }

        let sample = LoudnessSample {
            rms,
            block_duration_s: frames as f64 / f64::from(self.sample_rate),
            captured_at,
        };
        match self.sender.try_send(sample) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                self.diagnostics.record_drop();
                PushOutcome::Dropped
            }
            Err(TrySendError::Disconnected(_)) => PushOutcome::Disconnected,
        }
    }

    pub fn diagnostics(&self) -> &CaptureDiagnostics {
        &self.diagnostics
    }
}

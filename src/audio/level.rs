/// Floor applied before any logarithm so silence maps to -240 dBFS instead of -inf.
pub const RMS_EPSILON: f64 = 1e-12;

/// Replace NaN, infinities and negatives with [`RMS_EPSILON`].
#[inline]
pub fn sanitize_rms(rms: f64) -> f64 {
    if rms.is_finite() && rms >= RMS_EPSILON {
        rms
    } else {
        RMS_EPSILON
    }
}

/// `20 * log10(max(rms, 1e-12))`, never NaN.
#[inline]
pub fn dbfs_from_rms(rms: f64) -> f64 {
    20.0 * sanitize_rms(rms).log10()
}

/// Linear RMS amplitude for a dBFS level.
#[inline]
pub fn rms_from_dbfs(dbfs: f64) -> f64 {
    10f64.powf(dbfs / 20.0)
}

/// RMS of an interleaved block, downmixing each frame to mono first.
///
/// Returns `(rms, frames)`. Runs without allocating so it is safe to call from
/// the audio callback. A trailing partial frame is averaged over the channels
/// it has.
pub fn block_rms<T, F>(data: &[T], channels: usize, mut convert: F) -> (f64, usize)
where
    T: Copy,
    F: FnMut(T) -> f32,
{
    let channels = channels.max(1);
    let mut energy = 0.0f64;
    let mut frames = 0usize;

    for frame in data.chunks(channels) {
        let sum: f32 = frame.iter().copied().map(&mut convert).sum();
        let mono = f64::from(sum / frame.len() as f32);
        energy += mono * mono;
        frames += 1;
    }

    if frames == 0 {
        return (RMS_EPSILON.sqrt(), 0);
    }
    let rms = (energy / frames as f64 + RMS_EPSILON).sqrt();
    (rms, frames)
}

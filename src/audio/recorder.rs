//! System microphone capture via CPAL.
//!
//! Opens the selected input device, resolves a stream config close to the
//! requested rate/channels/buffering, and wires the data callback to a
//! [`BlockProducer`]. Everything downstream of the transfer queue is
//! hardware-independent.

use super::device::{DeviceSelector, LatencyMode};
use super::producer::BlockProducer;
use super::queue::{CaptureDiagnostics, LoudnessSample};
use crate::log_debug;
use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize};
use crossbeam_channel::Sender;

/// Capture parameters taken from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per callback, 0 lets the engine decide.
    pub block_size: u32,
    pub latency: LatencyMode,
    pub device: Option<DeviceSelector>,
    pub queue_capacity: usize,
}

/// What the device actually agreed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_frames: Option<u32>,
    pub sample_format: String,
    pub used_fallback: bool,
}

/// Audio input device wrapper.
pub struct Recorder {
    device: cpal::Device,
    name: String,
}

/// A running input stream. Dropping it releases the device.
pub struct CaptureStream {
    stream: cpal::Stream,
    resolved: ResolvedStream,
}

impl CaptureStream {
    pub fn resolved(&self) -> &ResolvedStream {
        &self.resolved
    }

    pub fn stop(self) {
        if let Err(err) = self.stream.pause() {
            log_debug(&format!("failed to pause audio stream: {err}"));
        }
        drop(self.stream);
    }
}

impl Recorder {
    /// Names of the devices that can record, in selector-index order.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        Ok(devices
            .map(|device| {
                device
                    .name()
                    .unwrap_or_else(|_| "Unknown Device".to_string())
            })
            .collect())
    }

    /// Open the selected device, or the system default.
    ///
    /// An unmatched name fragment falls back to the default device with a
    /// warning; an out-of-range index is an error.
    pub fn open(selector: Option<&DeviceSelector>) -> Result<Self> {
        let host = cpal::default_host();
        if let Some(selector) = selector {
            let devices: Vec<cpal::Device> = host
                .input_devices()
                .context("no input devices available")?
                .collect();
            let names: Vec<String> = devices
                .iter()
                .map(|d| d.name().unwrap_or_default())
                .collect();
            match selector.find_in(&names) {
                Some(index) => {
                    let device = devices
                        .into_iter()
                        .nth(index)
                        .ok_or_else(|| anyhow!("input device {index} disappeared"))?;
                    return Ok(Self {
                        device,
                        name: names[index].clone(),
                    });
                }
                None => match selector {
                    DeviceSelector::Index(index) => {
                        bail!(
                            "input device index {index} out of range ({} devices)",
                            names.len()
                        );
                    }
                    DeviceSelector::NameContains(fragment) => {
                        tracing::warn!(fragment = %fragment, "input device not found");
                        eprintln!(
                            "[WARN] Device matching '{fragment}' not found, using system default."
                        );
                    }
                },
            }
        }
        let device = host
            .default_input_device()
            .context("no default input device available")?;
        let name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());
        Ok(Self { device, name })
    }

    /// Start streaming blocks into `sender`. Each callback produces one
    /// loudness sample; overflow and device loss land in `diagnostics`.
    pub fn start(
        &self,
        cfg: &CaptureConfig,
        sender: Sender<LoudnessSample>,
        diagnostics: CaptureDiagnostics,
    ) -> Result<CaptureStream> {
        let (stream_config, format, used_fallback) = self.resolve_stream_config(cfg)?;
        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels.max(1);
        let buffer_frames = match stream_config.buffer_size {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some(frames),
        };
        log_debug(&format!(
            "Recorder config: format={format:?} sample_rate={sample_rate}Hz channels={channels} buffer={buffer_frames:?}"
        ));

        let producer = BlockProducer::new(
            sender,
            sample_rate,
            usize::from(channels),
            diagnostics.clone(),
        );
        let err_fn = move |err: cpal::StreamError| {
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                diagnostics.mark_device_lost();
            } else {
                diagnostics.record_overflow();
            }
            log_debug(&format!("audio_stream_error: {err}"));
        };

        let stream = match format {
            SampleFormat::F32 => self.device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    producer.push_block(data, false, |sample| sample);
                },
                err_fn,
                None,
            ),
            SampleFormat::I16 => self.device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    producer.push_block(data, false, |sample| sample as f32 / 32_768.0);
                },
                err_fn,
                None,
            ),
            SampleFormat::U16 => self.device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    producer.push_block(data, false, |sample| {
                        (sample as f32 - 32_768.0) / 32_768.0
                    });
                },
                err_fn,
                None,
            ),
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        }
        .with_context(|| format!("failed to open input stream on '{}'", self.name))?;

        stream
            .play()
            .with_context(|| format!("failed to start input stream on '{}'", self.name))?;

        Ok(CaptureStream {
            stream,
            resolved: ResolvedStream {
                device_name: self.name.clone(),
                sample_rate,
                channels,
                buffer_frames,
                sample_format: format!("{format:?}"),
                used_fallback,
            },
        })
    }

    fn resolve_stream_config(
        &self,
        cfg: &CaptureConfig,
    ) -> Result<(StreamConfig, SampleFormat, bool)> {
        let supported: Vec<_> = self
            .device
            .supported_input_configs()
            .with_context(|| format!("cannot query input configs of '{}'", self.name))?
            .collect();
        let matching = supported
            .iter()
            .filter(|range| {
                range.channels() == cfg.channels
                    && range.min_sample_rate().0 <= cfg.sample_rate
                    && cfg.sample_rate <= range.max_sample_rate().0
                    && format_rank(range.sample_format()).is_some()
            })
            .max_by_key(|range| format_rank(range.sample_format()));

        let (chosen, used_fallback) = match matching {
            Some(range) => (range.clone().with_sample_rate(SampleRate(cfg.sample_rate)), false),
            None => {
                let default = self
                    .device
                    .default_input_config()
                    .with_context(|| format!("no default input config for '{}'", self.name))?;
                log_debug(&format!(
                    "no input config with {} ch @ {} Hz on '{}'; using device default {} ch @ {} Hz",
                    cfg.channels,
                    cfg.sample_rate,
                    self.name,
                    default.channels(),
                    default.sample_rate().0
                ));
                (default, true)
            }
        };

        let format = chosen.sample_format();
        let mut stream_config = chosen.config();
        if let Some(frames) = requested_buffer_frames(cfg, stream_config.sample_rate.0) {
            let frames = clamp_buffer_frames(frames, chosen.buffer_size());
            stream_config.buffer_size = BufferSize::Fixed(frames);
        }
        Ok((stream_config, format, used_fallback))
    }
}

/// Preference order for sample formats we can convert; `None` if unsupported.
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::F32 => Some(3),
        SampleFormat::I16 => Some(2),
        SampleFormat::U16 => Some(1),
        _ => None,
    }
}

/// Frames per callback to request, or `None` for the engine default.
///
/// An explicit block size wins; otherwise the latency mode is converted to
/// frames at the stream rate.
pub fn requested_buffer_frames(cfg: &CaptureConfig, sample_rate: u32) -> Option<u32> {
    if cfg.block_size > 0 {
        return Some(cfg.block_size);
    }
    cfg.latency.seconds().map(|secs| {
        let frames = (secs * f64::from(sample_rate)).round();
        frames.clamp(1.0, f64::from(u32::MAX)) as u32
    })
}

fn clamp_buffer_frames(frames: u32, supported: &SupportedBufferSize) -> u32 {
    match supported {
        SupportedBufferSize::Range { min, max } if min <= max => frames.clamp(*min, *max),
        _ => frames,
    }
}

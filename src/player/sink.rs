// SPDX-License-Identifier: MPL-2.0
//! Audio sink: where decoded PCM goes.
//!
//! The sink is the single authority for audible volume and mute: both
//! are applied in the output callback, so audio that is already buffered
//! reacts immediately to a mute toggle instead of playing out first.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::error::{Error, MediaError, Result};

use super::volume::Volume;

/// Abstract PCM sink consumed by the audio pipeline.
///
/// `write` is best-effort and non-blocking: a failed or partial write is
/// logged and skipped by the caller, never retried synchronously.
pub trait AudioSink {
    /// Creates the output stream for interleaved S16LE at the given rate
    /// and channel count.
    fn create_stream(&mut self, sample_rate: u32, channels: u16) -> Result<()>;

    /// Queues interleaved S16LE bytes for playback.
    fn write(&mut self, pcm: &[u8]) -> Result<()>;

    fn set_volume(&mut self, volume: Volume);

    fn set_muted(&mut self, muted: bool);

    /// Tears down the stream and drops any queued audio.
    fn destroy_stream(&mut self);
}

/// Shared state between the audio callback and the controlling thread.
struct SharedState {
    /// Current gain (stored as u32 bits of f32 for atomic access).
    volume_bits: AtomicU32,

    /// Mute state.
    muted: AtomicBool,
}

impl SharedState {
    fn new(initial_volume: f32) -> Self {
        Self {
            volume_bits: AtomicU32::new(initial_volume.to_bits()),
            muted: AtomicBool::new(false),
        }
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    fn set_volume(&self, volume: f32) {
        self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }
}

/// Decodes little-endian signed 16-bit PCM bytes. A trailing odd byte is
/// ignored.
fn decode_s16le(pcm: &[u8]) -> impl Iterator<Item = i16> + '_ {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}

/// Audio sink backed by the system's default cpal output device.
pub struct CpalSink {
    shared: Arc<SharedState>,
    queue: Arc<Mutex<VecDeque<i16>>>,
    stream: Option<cpal::Stream>,
    max_queued_samples: usize,
}

impl CpalSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SharedState::new(1.0)),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            stream: None,
            max_queued_samples: 0,
        }
    }

    /// Finds an output config matching the requested rate and channel
    /// count, falling back to the device default (logged; playback then
    /// runs at the device's native rate).
    fn pick_config(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
    ) -> Result<cpal::SupportedStreamConfig> {
        if let Ok(mut configs) = device.supported_output_configs() {
            if let Some(range) = configs.find(|c| {
                c.channels() == channels
                    && c.min_sample_rate().0 <= sample_rate
                    && sample_rate <= c.max_sample_rate().0
            }) {
                return Ok(range.with_sample_rate(cpal::SampleRate(sample_rate)));
            }
        }

        let default = device.default_output_config().map_err(|e| {
            Error::Media(MediaError::SinkUnavailable(format!(
                "failed to query audio config: {e}"
            )))
        })?;
        warn!(
            sample_rate,
            channels, "no exact output config; falling back to device default"
        );
        Ok(default)
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        queue: Arc<Mutex<VecDeque<i16>>>,
        shared: Arc<SharedState>,
    ) -> Result<cpal::Stream> {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let volume = shared.volume();
                    let muted = shared.is_muted();

                    let Ok(mut queue) = queue.lock() else {
                        // Mutex poisoned, output silence
                        for sample in data.iter_mut() {
                            *sample = T::from_sample(0.0f32);
                        }
                        return;
                    };

                    for sample in data.iter_mut() {
                        // Drain the queue even while muted so stale audio
                        // does not play back on unmute.
                        let queued = queue.pop_front();
                        let value = if muted {
                            0.0
                        } else {
                            queued.map_or(0.0, |s| f32::from(s) / 32768.0 * volume)
                        };
                        // Clamping slightly below 1.0 prevents i16
                        // overflow in from_sample.
                        *sample = T::from_sample(value.clamp(-1.0, 0.999_999_9));
                    }
                },
                |err| {
                    warn!("audio output error: {err}");
                },
                None,
            )
            .map_err(|e| {
                Error::Media(MediaError::SinkUnavailable(format!(
                    "failed to build audio stream: {e}"
                )))
            })?;

        Ok(stream)
    }
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for CpalSink {
    fn create_stream(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            Error::Media(MediaError::SinkUnavailable(
                "no audio output device found".to_string(),
            ))
        })?;

        let supported = Self::pick_config(&device, sample_rate, channels)?;

        // Cap queued audio at roughly one second.
        self.max_queued_samples = sample_rate as usize * usize::from(channels);

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &supported.into(),
                Arc::clone(&self.queue),
                Arc::clone(&self.shared),
            )?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &supported.into(),
                Arc::clone(&self.queue),
                Arc::clone(&self.shared),
            )?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &supported.into(),
                Arc::clone(&self.queue),
                Arc::clone(&self.shared),
            )?,
            other => {
                return Err(Error::Media(MediaError::SinkUnavailable(format!(
                    "unsupported audio sample format: {other:?}"
                ))))
            }
        };

        stream.play().map_err(|e| {
            Error::Media(MediaError::SinkUnavailable(format!(
                "failed to start audio stream: {e}"
            )))
        })?;

        self.stream = Some(stream);
        Ok(())
    }

    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::Media(MediaError::SinkUnavailable(
                "audio stream not created".to_string(),
            )));
        }

        let Ok(mut queue) = self.queue.lock() else {
            return Err(Error::Media(MediaError::SinkUnavailable(
                "audio queue poisoned".to_string(),
            )));
        };

        // Drop samples that would overflow the cap: losing audio beats
        // unbounded memory growth.
        let available = self.max_queued_samples.saturating_sub(queue.len());
        queue.extend(decode_s16le(pcm).take(available));
        Ok(())
    }

    fn set_volume(&mut self, volume: Volume) {
        self.shared.set_volume(volume.as_scale());
    }

    fn set_muted(&mut self, muted: bool) {
        self.shared.set_muted(muted);
    }

    fn destroy_stream(&mut self) {
        self.stream = None;
        if let Ok(mut queue) = self.queue.lock() {
            queue.clear();
        }
    }
}

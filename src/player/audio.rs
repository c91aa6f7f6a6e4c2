// SPDX-License-Identifier: MPL-2.0
//! Audio pipeline: demuxes and decodes only the audio stream on its own
//! thread and feeds the sink.
//!
//! The thread owns a private [`AudioInput`], a second and independent
//! open of the media file, so it never contends with the video decoder
//! on read position. It shares nothing with the video path except the
//! play/mute/volume flags in [`AudioControls`], which are plain atomics:
//! a one-iteration lag in reacting to a flip is acceptable, so no locks
//! are needed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::decode::{AudioInput, AudioStatus};
use super::sink::{AudioSink, CpalSink};
use super::volume::Volume;

/// Idle poll interval while paused or muted.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// How far ahead of real time audio is queued into the sink. Keeps the
/// sink callback fed across scheduling hiccups without letting decode
/// run arbitrarily far ahead.
const LOOKAHEAD_SECS: f64 = 0.2;

/// Cap on repeated write-failure warnings per thread lifetime.
const MAX_WRITE_WARNINGS: u32 = 5;

/// Play/mute/volume state shared between the player and the audio
/// thread. Read each loop iteration; eventually consistent by design.
#[derive(Clone)]
pub struct AudioControls {
    inner: Arc<ControlsInner>,
}

struct ControlsInner {
    playing: AtomicBool,
    muted: AtomicBool,
    volume_percent: AtomicU8,
}

impl AudioControls {
    #[must_use]
    pub fn new(volume: Volume, muted: bool) -> Self {
        Self {
            inner: Arc::new(ControlsInner {
                playing: AtomicBool::new(false),
                muted: AtomicBool::new(muted),
                volume_percent: AtomicU8::new(volume.percent()),
            }),
        }
    }

    pub fn set_playing(&self, playing: bool) {
        self.inner.playing.store(playing, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::Relaxed)
    }

    pub fn set_muted(&self, muted: bool) {
        self.inner.muted.store(muted, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.inner.muted.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, volume: Volume) {
        self.inner
            .volume_percent
            .store(volume.percent(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn volume(&self) -> Volume {
        Volume::new(i32::from(self.inner.volume_percent.load(Ordering::Relaxed)))
    }
}

/// Handle to the audio thread. Supervised: the thread checks a running
/// flag every iteration and is joined on [`shutdown`](Self::shutdown)
/// (or drop) before any player state it reads is freed.
pub struct AudioPipeline {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AudioPipeline {
    /// Spawns the audio thread for `path`.
    ///
    /// Returns `None` when the file has no audio stream. A sink that
    /// fails to open later shuts the thread down quietly: audio is
    /// disabled for this media and video playback is unaffected.
    pub fn spawn(path: &Path, controls: AudioControls) -> Option<Self> {
        // Cheap probe so no thread exists for silent media.
        match AudioInput::open(path) {
            Ok(Some(_)) => {}
            Ok(None) => return None,
            Err(e) => {
                warn!("audio probe failed, continuing without audio: {e}");
                return None;
            }
        }

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let thread_path: PathBuf = path.to_path_buf();

        let handle = std::thread::Builder::new()
            .name("muralis-audio".into())
            .spawn(move || audio_thread(thread_path, &thread_running, &controls))
            .ok()?;

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Cooperative shutdown: clears the running flag and joins.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AudioPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn audio_thread(path: PathBuf, running: &AtomicBool, controls: &AudioControls) {
    let mut input = match AudioInput::open(&path) {
        Ok(Some(input)) => input,
        Ok(None) => return,
        Err(e) => {
            warn!("audio thread could not open {}: {e}", path.display());
            return;
        }
    };

    let mut sink = CpalSink::new();
    if let Err(e) = sink.create_stream(input.sample_rate(), input.channels()) {
        warn!("audio disabled for this media: {e}");
        return;
    }
    debug!(
        sample_rate = input.sample_rate(),
        channels = input.channels(),
        "audio thread started"
    );

    run_loop(&mut input, &mut sink, running, controls);
    sink.destroy_stream();
    debug!("audio thread stopped");
}

/// The decode/convert/write loop, separated from thread plumbing so it
/// can drive any [`AudioSink`].
fn run_loop(
    input: &mut AudioInput,
    sink: &mut dyn AudioSink,
    running: &AtomicBool,
    controls: &AudioControls,
) {
    let sample_rate = f64::from(input.sample_rate());
    let mut warned_unsupported = false;
    let mut write_warnings = 0u32;

    // Wall-clock pacing: decode stays LOOKAHEAD_SECS ahead of the amount
    // of audio already handed to the sink.
    let mut anchor: Option<Instant> = None;
    let mut queued_secs = 0.0f64;

    while running.load(Ordering::Relaxed) {
        sink.set_volume(controls.volume());
        sink.set_muted(controls.muted());

        if !controls.is_playing() || controls.is_muted() {
            anchor = None;
            queued_secs = 0.0;
            std::thread::sleep(IDLE_POLL);
            continue;
        }

        match input.decode_next() {
            Ok(AudioStatus::Frame(frame)) => {
                let chunk_secs = frame.samples() as f64 / sample_rate;

                let started = *anchor.get_or_insert_with(Instant::now);
                let ahead = queued_secs - started.elapsed().as_secs_f64() - LOOKAHEAD_SECS;
                if ahead > 0.0 {
                    std::thread::sleep(Duration::from_secs_f64(ahead));
                }

                let pcm = convert_to_s16_interleaved(&frame, &mut warned_unsupported);
                if let Err(e) = sink.write(&pcm) {
                    if write_warnings < MAX_WRITE_WARNINGS {
                        warn!("dropping audio chunk: {e}");
                        write_warnings += 1;
                    }
                }
                queued_secs += chunk_secs;
            }
            Ok(AudioStatus::EndOfStream) => {
                // Mirror video looping: back to the start, forever.
                if let Err(e) = input.seek_to_start() {
                    warn!("audio loop seek failed: {e}");
                    std::thread::sleep(IDLE_POLL);
                }
            }
            Err(e) => {
                warn!("transient audio decode error: {e}");
            }
        }
    }
}

/// Converts a decoded audio frame to interleaved S16LE bytes.
///
/// Handles the three layouts that cover common codecs: already
/// interleaved 16-bit, planar 32-bit float, and planar 16-bit. Anything
/// else produces silence of the right length (warned once per stream).
fn convert_to_s16_interleaved(
    frame: &ffmpeg_next::frame::Audio,
    warned_unsupported: &mut bool,
) -> Vec<u8> {
    use ffmpeg_next::format::sample::Type;
    use ffmpeg_next::format::Sample;

    let samples = frame.samples();
    let channels = usize::from(frame.channels());

    match frame.format() {
        Sample::I16(Type::Packed) => {
            let byte_len = samples * channels * 2;
            frame.data(0)[..byte_len].to_vec()
        }
        Sample::F32(Type::Planar) => {
            let planes: Vec<&[f32]> = (0..channels).map(|ch| frame.plane::<f32>(ch)).collect();
            interleave_f32_planes(&planes, samples)
        }
        Sample::I16(Type::Planar) => {
            let planes: Vec<&[i16]> = (0..channels).map(|ch| frame.plane::<i16>(ch)).collect();
            interleave_i16_planes(&planes, samples)
        }
        other => {
            if !*warned_unsupported {
                warn!("unsupported audio sample format {other:?}, outputting silence");
                *warned_unsupported = true;
            }
            vec![0u8; samples * channels * 2]
        }
    }
}

/// Interleaves planar f32 samples into S16LE bytes, clamping to [-1, 1].
fn interleave_f32_planes(planes: &[&[f32]], samples: usize) -> Vec<u8> {
    let channels = planes.len();
    let mut out = Vec::with_capacity(samples * channels * 2);
    for sample in 0..samples {
        for plane in planes {
            let value = plane.get(sample).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
            #[allow(clippy::cast_possible_truncation)]
            let converted = (value * 32767.0) as i16;
            out.extend_from_slice(&converted.to_le_bytes());
        }
    }
    out
}

/// Interleaves planar i16 samples into S16LE bytes.
fn interleave_i16_planes(planes: &[&[i16]], samples: usize) -> Vec<u8> {
    let channels = planes.len();
    let mut out = Vec::with_capacity(samples * channels * 2);
    for sample in 0..samples {
        for plane in planes {
            let value = plane.get(sample).copied().unwrap_or(0);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controls_default_to_stopped() {
        let controls = AudioControls::new(Volume::default(), false);
        assert!(!controls.is_playing());
        assert!(!controls.is_muted());
        assert_eq!(controls.volume().percent(), 100);
    }

    #[test]
    fn controls_propagate_between_clones() {
        let controls = AudioControls::new(Volume::new(80), false);
        let seen_by_thread = controls.clone();

        controls.set_playing(true);
        controls.set_muted(true);
        controls.set_volume(Volume::new(25));

        assert!(seen_by_thread.is_playing());
        assert!(seen_by_thread.is_muted());
        assert_eq!(seen_by_thread.volume().percent(), 25);
    }

    #[test]
    fn interleave_f32_converts_and_clamps() {
        let left = [0.0f32, 1.0, -1.0, 2.0];
        let right = [0.5f32, -0.5, 0.0, -2.0];
        let planes: Vec<&[f32]> = vec![&left, &right];

        let pcm = interleave_f32_planes(&planes, 4);
        assert_eq!(pcm.len(), 4 * 2 * 2);

        let sample = |i: usize| i16::from_le_bytes([pcm[i * 2], pcm[i * 2 + 1]]);
        assert_eq!(sample(0), 0); // L0
        assert_eq!(sample(1), 16383); // R0 = 0.5
        assert_eq!(sample(2), 32767); // L1 = 1.0
        assert_eq!(sample(6), 32767); // L3 clamped from 2.0
        assert_eq!(sample(7), -32767); // R3 clamped from -2.0
    }

    #[test]
    fn interleave_i16_interleaves_channels() {
        let left = [1i16, 3, 5];
        let right = [2i16, 4, 6];
        let planes: Vec<&[i16]> = vec![&left, &right];

        let pcm = interleave_i16_planes(&planes, 3);
        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn interleave_handles_mono() {
        let mono = [100i16, -100];
        let planes: Vec<&[i16]> = vec![&mono];
        let pcm = interleave_i16_planes(&planes, 2);
        assert_eq!(pcm.len(), 4);
    }

    #[test]
    fn short_planes_pad_with_silence() {
        let left = [1i16];
        let right = [2i16];
        let planes: Vec<&[i16]> = vec![&left, &right];
        // Asking for more samples than the planes hold must not panic.
        let pcm = interleave_i16_planes(&planes, 3);
        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(samples, vec![1, 2, 0, 0, 0, 0]);
    }

    #[test]
    fn spawn_returns_none_for_missing_file() {
        let controls = AudioControls::new(Volume::default(), false);
        assert!(AudioPipeline::spawn(Path::new("/nonexistent/clip.mp4"), controls).is_none());
    }

    #[test]
    fn spawn_returns_none_for_non_media_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("silence.mp4");
        std::fs::write(&path, b"not a real container").unwrap();

        let controls = AudioControls::new(Volume::default(), false);
        assert!(AudioPipeline::spawn(&path, controls).is_none());
    }
}

// SPDX-License-Identifier: MPL-2.0
//! Media playback engine.
//!
//! [`MediaPlayer`] is the facade over the decode adapter, playback clock,
//! frame producer and audio pipeline. The caller's render thread drives
//! it cooperatively: call [`MediaPlayer::render_to`] every tick; the
//! display gate inside decides when a frame is actually presented. Audio
//! runs on its own supervised thread and never blocks video timing.

pub mod audio;
pub mod clock;
pub mod decode;
pub mod frames;
pub mod sink;
mod volume;

pub use audio::{AudioControls, AudioPipeline};
pub use clock::{PacingMode, PlaybackClock};
pub use decode::{DecodeStatus, DecodedFrame, VideoInput};
pub use frames::FrameProducer;
pub use sink::{AudioSink, CpalSink};
pub use volume::Volume;

use crate::compositor::{self, ScalingMode};
use crate::config::PlayerSettings;
use crate::error::{MediaError, Result};
use crate::media::{MediaKind, MediaSource};
use crate::surface::PresentationSurface;
use std::path::Path;
use tracing::{debug, info};

/// Playback lifecycle. `Stopped` differs from `Paused` in that the
/// playback timestamp is reset to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No media loaded.
    Unloaded,

    /// Media loaded, playback not started.
    Loaded,

    /// Actively decoding and presenting; audio may be audible.
    Playing,

    /// Suspended at the current position.
    Paused,

    /// Suspended and rewound to the start.
    Stopped,
}

impl PlaybackState {
    #[must_use]
    pub fn is_playing(self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// The media decode/timing engine.
pub struct MediaPlayer {
    settings: PlayerSettings,
    source: Option<MediaSource>,
    producer: Option<FrameProducer>,
    audio: Option<AudioPipeline>,
    controls: AudioControls,
    state: PlaybackState,
    scratch: Vec<u8>,
    last_logged_mode: Option<ScalingMode>,
}

impl MediaPlayer {
    #[must_use]
    pub fn new(settings: PlayerSettings) -> Self {
        let controls = AudioControls::new(settings.volume, settings.muted);
        Self {
            settings,
            source: None,
            producer: None,
            audio: None,
            controls,
            state: PlaybackState::Unloaded,
            scratch: Vec::new(),
            last_logged_mode: None,
        }
    }

    /// Loads a media file, tearing down all decode state of the previous
    /// one first (the audio thread is joined before its file handles are
    /// dropped).
    ///
    /// # Errors
    ///
    /// Fails when the file kind is unknown, the file cannot be opened,
    /// or it has no decodable video stream. On failure no media is
    /// loaded.
    pub fn load_media<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.teardown_media();

        let source = MediaSource::new(path.as_ref());
        if source.kind() == MediaKind::Unknown {
            return Err(MediaError::UnsupportedFormat.into());
        }

        let mut producer = FrameProducer::open(&source)?;
        if let Some(rate) = self.settings.display_rate {
            producer.set_display_rate(rate);
        }

        if producer.has_audio() {
            self.audio = AudioPipeline::spawn(source.path(), self.controls.clone());
        }

        info!(
            path = %source.path().display(),
            kind = ?source.kind(),
            audio = self.audio.is_some(),
            "media loaded"
        );
        self.source = Some(source);
        self.producer = Some(producer);
        self.state = PlaybackState::Loaded;
        Ok(())
    }

    /// Starts or resumes playback. Returns false when nothing is loaded.
    pub fn play(&mut self) -> bool {
        if self.producer.is_none() {
            return false;
        }
        self.state = PlaybackState::Playing;
        self.controls.set_playing(true);
        true
    }

    /// Pauses playback at the current position.
    pub fn pause(&mut self) {
        if self.producer.is_some() {
            self.state = PlaybackState::Paused;
        }
        self.controls.set_playing(false);
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&mut self) -> Result<()> {
        self.controls.set_playing(false);
        if let Some(producer) = self.producer.as_mut() {
            producer.rewind()?;
            self.state = PlaybackState::Stopped;
        }
        Ok(())
    }

    /// Sets audio volume. Takes effect on in-flight audio immediately
    /// (the sink applies it in its output callback).
    pub fn set_volume(&mut self, volume: Volume) {
        self.settings.volume = volume;
        self.controls.set_volume(volume);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
        self.controls.set_muted(muted);
    }

    /// Sets the display rate limit. A rate ≤ 0 restores the native
    /// frame rate.
    pub fn set_display_rate(&mut self, rate: f64) {
        self.settings.display_rate = if rate > 0.0 { Some(rate) } else { None };
        if let Some(producer) = self.producer.as_mut() {
            producer.set_display_rate(rate);
        }
    }

    pub fn set_scaling_mode(&mut self, mode: ScalingMode) {
        self.settings.scaling = mode;
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    #[must_use]
    pub fn media_kind(&self) -> Option<MediaKind> {
        self.source.as_ref().map(MediaSource::kind)
    }

    #[must_use]
    pub fn is_video(&self) -> bool {
        self.media_kind().is_some_and(MediaKind::is_animated)
    }

    /// Source dimensions of the loaded media.
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.producer.as_ref().map(FrameProducer::dimensions)
    }

    /// Whether the loaded media has a running audio pipeline.
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Drives one render tick against `surface`.
    ///
    /// Decode advances whenever the player is playing, even on ticks
    /// where the display gate stays closed, so a limited display rate
    /// never slows the video down. Returns `Ok(true)` when a frame was
    /// composited and presented.
    pub fn render_to(&mut self, surface: &mut dyn PresentationSurface) -> Result<bool> {
        let Some(producer) = self.producer.as_mut() else {
            return Ok(false);
        };

        if self.state.is_playing() || producer.kind() == MediaKind::Image {
            producer.get_frame()?;
        }

        if !producer.should_display_frame() {
            return Ok(false);
        }

        let frame = producer.current_frame();
        if frame.is_empty() {
            return Ok(false);
        }

        let (dst_width, dst_height) = surface.dimensions();
        let mode = self.settings.scaling;
        if self.last_logged_mode != Some(mode) {
            debug!(%mode, "applying scaling mode");
            self.last_logged_mode = Some(mode);
        }

        self.scratch
            .resize(dst_width as usize * dst_height as usize * 4, 0);
        compositor::composite(
            compositor::FrameRef {
                data: &frame.data,
                width: frame.width,
                height: frame.height,
            },
            &mut self.scratch,
            dst_width,
            dst_height,
            mode,
            surface.pixel_layout(),
            surface.needs_vertical_flip(),
        );

        surface.present(&self.scratch, dst_width, dst_height)?;
        Ok(true)
    }

    /// Tears down all decode and audio state. Also runs on drop.
    pub fn cleanup(&mut self) {
        self.teardown_media();
    }

    /// Joins the audio thread before dropping the decode state it was
    /// spawned alongside.
    fn teardown_media(&mut self) {
        if let Some(mut audio) = self.audio.take() {
            audio.shutdown();
        }
        self.producer = None;
        self.source = None;
        self.controls.set_playing(false);
        self.state = PlaybackState::Unloaded;
    }
}

impl Drop for MediaPlayer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

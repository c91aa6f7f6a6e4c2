// SPDX-License-Identifier: MPL-2.0
//! Frame producer: turns the decode adapter into an endless, correctly
//! paced frame stream.
//!
//! Owns exactly one [`DecodedFrame`] buffer, overwritten in place on each
//! decode. Consumers must finish with the borrowed frame (i.e. complete
//! their composite call) before asking for the next one; there is no
//! queue.

use crate::error::{MediaError, Result};
use crate::media::{MediaKind, MediaSource};
use tracing::{debug, trace};

use super::clock::PlaybackClock;
use super::decode::{DecodeStatus, DecodedFrame, VideoInput};

pub struct FrameProducer {
    kind: MediaKind,
    video: Option<VideoInput>,
    clock: PlaybackClock,
    frame: DecodedFrame,
    width: u32,
    height: u32,
    has_audio: bool,
}

impl FrameProducer {
    /// Opens the media file and prepares frame production.
    ///
    /// Static images are decoded once, here; every later `get_frame`
    /// returns the same cached buffer. Videos and animated images keep
    /// their decode handle open for streaming.
    pub fn open(source: &MediaSource) -> Result<Self> {
        match source.kind() {
            MediaKind::Unknown => Err(MediaError::UnsupportedFormat.into()),
            MediaKind::Image => {
                let frame = VideoInput::decode_single_image(source.path())?;
                let (width, height) = (frame.width, frame.height);
                Ok(Self {
                    kind: MediaKind::Image,
                    video: None,
                    clock: PlaybackClock::new(0.0),
                    frame,
                    width,
                    height,
                    has_audio: false,
                })
            }
            kind => {
                let input = VideoInput::open(source.path())?;
                let clock = PlaybackClock::new(input.native_frame_rate());
                let (width, height) = (input.width(), input.height());
                let has_audio = input.has_audio();
                debug!(
                    width,
                    height,
                    rate = clock.native_rate(),
                    has_audio,
                    "opened media for streaming"
                );
                Ok(Self {
                    kind,
                    video: Some(input),
                    clock,
                    frame: DecodedFrame::default(),
                    width,
                    height,
                    has_audio,
                })
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the container declares an audio stream (videos only).
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    #[must_use]
    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Forwards the display rate limit to the clock.
    pub fn set_display_rate(&mut self, rate: f64) {
        self.clock.set_target_display_rate(rate);
    }

    /// Returns the current frame without advancing decode. Empty until
    /// the first `get_frame` for videos; always populated for images.
    #[must_use]
    pub fn current_frame(&self) -> &DecodedFrame {
        &self.frame
    }

    /// Advances to the next frame and returns it.
    ///
    /// For videos this decodes the next frame (paced by the clock in
    /// native-speed mode) and loops back to the start at end of stream,
    /// so the stream never ends. For images the cached frame is returned
    /// unchanged, byte-identical on every call.
    pub fn get_frame(&mut self) -> Result<&DecodedFrame> {
        if let Some(input) = self.video.as_mut() {
            match input.decode_next(&mut self.frame)? {
                DecodeStatus::Frame => {}
                DecodeStatus::EndOfStream => {
                    trace!("end of stream, looping back to start");
                    input.seek_to_start()?;
                    self.clock.on_loop();

                    // A container that yields no frame even from the top
                    // is not an endless stream; bail instead of recursing.
                    match input.decode_next(&mut self.frame)? {
                        DecodeStatus::Frame => {}
                        DecodeStatus::EndOfStream => {
                            return Err(MediaError::DecodeTransient(
                                "no decodable frames after seeking to start".into(),
                            )
                            .into());
                        }
                    }
                }
            }
            let pts = self.frame.pts_secs;
            self.clock.pace(pts);
        }
        Ok(&self.frame)
    }

    /// True when it is time to present a frame at the target display
    /// rate. Must be polled every tick; decode keeps advancing through
    /// `get_frame` regardless of the answer.
    pub fn should_display_frame(&mut self) -> bool {
        self.clock.should_display_frame()
    }

    /// Rewinds playback to the start (stop semantics: timestamp back
    /// to 0).
    pub fn rewind(&mut self) -> Result<()> {
        if let Some(input) = self.video.as_mut() {
            input.seek_to_start()?;
        }
        self.clock.reset();
        self.frame.pts_secs = 0.0;
        Ok(())
    }
}

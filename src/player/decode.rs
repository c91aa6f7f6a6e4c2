// SPDX-License-Identifier: MPL-2.0
//! Demux/decode adapter wrapping FFmpeg.
//!
//! Two independent handles exist: [`VideoInput`] for the render-driving
//! thread and [`AudioInput`] for the audio thread. They never share a
//! container context; each owns its own demuxer so the two threads never
//! contend on read position.
//!
//! Opening a file performs blocking I/O; it happens once per load.

use crate::error::{Error, MediaError, Result};
use std::path::Path;
use std::sync::Once;
use tracing::warn;

/// Frame rate assumed when the container declares none.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Static flag to ensure FFmpeg is initialized only once.
static FFMPEG_INIT: Once = Once::new();

/// Initialize FFmpeg with appropriate log level.
///
/// This function is safe to call multiple times - initialization will only
/// happen once thanks to `std::sync::Once`. The FFmpeg log level is lowered
/// to ERROR to suppress per-file warning chatter.
pub fn init_ffmpeg() -> Result<()> {
    let mut init_result: Result<()> = Ok(());

    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            init_result = Err(Error::Io(format!("FFmpeg initialization failed: {e}")));
            return;
        }

        // SAFETY: av_log_set_level is thread-safe and only affects logging
        unsafe {
            ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
        }
    });

    init_result
}

/// A decoded video frame in tightly packed RGBA.
///
/// The frame producer owns exactly one of these and overwrites it in
/// place on every decode; consumers borrow it for the duration of a
/// single composite call.
#[derive(Debug, Clone, Default)]
pub struct DecodedFrame {
    /// RGBA pixel data (width × height × 4 bytes).
    pub data: Vec<u8>,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Presentation timestamp in seconds, monotonic within a play-through.
    pub pts_secs: f64,
}

impl DecodedFrame {
    /// Returns the total size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no frame has been decoded into this buffer yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outcome of a video decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// A frame was decoded into the output buffer.
    Frame,

    /// The demuxer ran out of packets. Not an error: the caller seeks
    /// back to the start and continues.
    EndOfStream,
}

/// Video-side demux/decode handle.
pub struct VideoInput {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    time_base: f64,
    native_frame_rate: f64,
    width: u32,
    height: u32,
    has_audio: bool,
}

impl VideoInput {
    /// Opens a media file and prepares decoding of its first video
    /// stream (images decode through the same path as single-frame
    /// streams).
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` when the file cannot be opened and
    /// `MediaError::UnsupportedFormat` when it has no decodable video
    /// stream or reports zero dimensions.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        init_ffmpeg()?;

        let ictx = ffmpeg_next::format::input(&path)
            .map_err(|e| Error::Io(format!("Failed to open media: {e}")))?;

        let (stream_index, time_base, native_frame_rate, parameters) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or(MediaError::UnsupportedFormat)?;
            let tb = stream.time_base();
            let time_base = f64::from(tb.numerator()) / f64::from(tb.denominator());
            (
                stream.index(),
                time_base,
                detect_frame_rate(&stream),
                stream.parameters(),
            )
        };
        let has_audio = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .is_some();

        let context_decoder = ffmpeg_next::codec::context::Context::from_parameters(parameters)
            .map_err(|e| Error::Io(format!("Failed to create codec context: {e}")))?;
        let decoder = context_decoder
            .decoder()
            .video()
            .map_err(|e| Error::Media(MediaError::UnsupportedCodec(e.to_string())))?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(MediaError::UnsupportedFormat.into());
        }

        // Pixel-format conversion to tightly packed RGBA, same dimensions.
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGBA,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| Error::Io(format!("Failed to create scaler: {e}")))?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            native_frame_rate,
            width,
            height,
            has_audio,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frame rate declared by the stream, falling back to
    /// [`FALLBACK_FRAME_RATE`]. Always > 0.
    #[must_use]
    pub fn native_frame_rate(&self) -> f64 {
        self.native_frame_rate
    }

    /// Whether the container also carries an audio stream.
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    /// Decodes the next video frame into `out`.
    ///
    /// Transient packet/frame failures are logged and skipped; only
    /// running out of packets surfaces, as [`DecodeStatus::EndOfStream`].
    #[allow(clippy::cast_precision_loss)] // FFmpeg i64 timestamps fit f64
    pub fn decode_next(&mut self, out: &mut DecodedFrame) -> Result<DecodeStatus> {
        let Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            ..
        } = self;

        for (stream, packet) in ictx.packets() {
            if stream.index() != *stream_index {
                continue;
            }

            if let Err(e) = decoder.send_packet(&packet) {
                warn!("skipping undecodable video packet: {e}");
                continue;
            }

            let mut decoded = ffmpeg_next::frame::Video::empty();
            if decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgba = ffmpeg_next::frame::Video::empty();
                if let Err(e) = scaler.run(&decoded, &mut rgba) {
                    warn!("skipping frame that failed RGBA conversion: {e}");
                    continue;
                }

                let pts_secs = decoded
                    .timestamp()
                    .map_or(0.0, |pts| pts as f64 * *time_base);
                copy_rgba_plane(&rgba, out, pts_secs);
                return Ok(DecodeStatus::Frame);
            }
        }

        Ok(DecodeStatus::EndOfStream)
    }

    /// Seeks back to the start of the stream for looping playback.
    pub fn seek_to_start(&mut self) -> Result<()> {
        self.ictx.seek(0, ..=0).map_err(|e| {
            Error::Media(MediaError::DecodeTransient(format!(
                "seek to start failed: {e}"
            )))
        })?;
        self.decoder.flush();
        Ok(())
    }

    /// Decodes a static image as a single frame.
    pub fn decode_single_image<P: AsRef<Path>>(path: P) -> Result<DecodedFrame> {
        let mut input = Self::open(path)?;
        let mut frame = DecodedFrame::default();
        match input.decode_next(&mut frame)? {
            DecodeStatus::Frame => {
                frame.pts_secs = 0.0;
                Ok(frame)
            }
            DecodeStatus::EndOfStream => Err(MediaError::UnsupportedFormat.into()),
        }
    }
}

/// Copies the RGBA plane into the reusable frame buffer, handling stride.
fn copy_rgba_plane(rgba: &ffmpeg_next::frame::Video, out: &mut DecodedFrame, pts_secs: f64) {
    let width = rgba.width();
    let height = rgba.height();
    let data = rgba.data(0);
    let stride = rgba.stride(0);

    out.data.clear();
    out.data.reserve(width as usize * height as usize * 4);
    for y in 0..height as usize {
        let row_start = y * stride;
        let row_end = row_start + width as usize * 4;
        out.data.extend_from_slice(&data[row_start..row_end]);
    }

    out.width = width;
    out.height = height;
    out.pts_secs = pts_secs;
}

fn detect_frame_rate(stream: &ffmpeg_next::Stream) -> f64 {
    let rate = stream.rate();
    if rate.numerator() > 0 && rate.denominator() > 0 {
        return f64::from(rate.numerator()) / f64::from(rate.denominator());
    }

    let avg = stream.avg_frame_rate();
    if avg.numerator() > 0 && avg.denominator() > 0 {
        return f64::from(avg.numerator()) / f64::from(avg.denominator());
    }

    FALLBACK_FRAME_RATE
}

/// Outcome of an audio decode call.
pub enum AudioStatus {
    /// A raw audio frame was decoded.
    Frame(ffmpeg_next::frame::Audio),

    /// The demuxer ran out of packets; the audio loop seeks to the start.
    EndOfStream,
}

/// Audio-side demux/decode handle.
///
/// This is a second, independent open of the same file, owned exclusively
/// by the audio thread.
pub struct AudioInput {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Audio,
    stream_index: usize,
    sample_rate: u32,
    channels: u16,
}

impl AudioInput {
    /// Opens the audio stream of a media file. Returns `Ok(None)` when
    /// the file has no audio stream (the player then runs video-only).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        init_ffmpeg()?;

        let ictx = ffmpeg_next::format::input(&path)
            .map_err(|e| Error::Io(format!("Failed to open media: {e}")))?;

        let Some((stream_index, parameters)) = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .map(|stream| (stream.index(), stream.parameters()))
        else {
            return Ok(None);
        };

        let context_decoder = ffmpeg_next::codec::context::Context::from_parameters(parameters)
            .map_err(|e| Error::Io(format!("Failed to create codec context: {e}")))?;
        let decoder = context_decoder
            .decoder()
            .audio()
            .map_err(|e| Error::Media(MediaError::UnsupportedCodec(e.to_string())))?;

        let sample_rate = decoder.rate();
        let channels = decoder.channels();

        Ok(Some(Self {
            ictx,
            decoder,
            stream_index,
            sample_rate,
            channels,
        }))
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Decodes the next audio frame. Transient failures are logged and
    /// skipped, mirroring the video side.
    pub fn decode_next(&mut self) -> Result<AudioStatus> {
        let Self {
            ictx,
            decoder,
            stream_index,
            ..
        } = self;

        for (stream, packet) in ictx.packets() {
            if stream.index() != *stream_index {
                continue;
            }

            if let Err(e) = decoder.send_packet(&packet) {
                warn!("skipping undecodable audio packet: {e}");
                continue;
            }

            let mut decoded = ffmpeg_next::frame::Audio::empty();
            if decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(AudioStatus::Frame(decoded));
            }
        }

        Ok(AudioStatus::EndOfStream)
    }

    /// Seeks back to the start for looping playback.
    pub fn seek_to_start(&mut self) -> Result<()> {
        self.ictx.seek(0, ..=0).map_err(|e| {
            Error::Media(MediaError::DecodeTransient(format!(
                "audio seek to start failed: {e}"
            )))
        })?;
        self.decoder.flush();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_frame_reports_size() {
        let frame = DecodedFrame {
            data: vec![0u8; 1920 * 1080 * 4],
            width: 1920,
            height: 1080,
            pts_secs: 0.0,
        };
        assert_eq!(frame.size_bytes(), 1920 * 1080 * 4);
        assert!(!frame.is_empty());
    }

    #[test]
    fn default_frame_is_empty() {
        let frame = DecodedFrame::default();
        assert!(frame.is_empty());
        assert_eq!(frame.size_bytes(), 0);
    }

    #[test]
    fn open_fails_for_nonexistent_file() {
        let result = VideoInput::open("/nonexistent/clip.mp4");
        assert!(result.is_err());
    }

    #[test]
    fn open_fails_for_non_media_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("not_media.mp4");
        std::fs::write(&path, b"this is not a video").unwrap();

        assert!(VideoInput::open(&path).is_err());
    }

    #[test]
    fn audio_open_fails_for_nonexistent_file() {
        assert!(AudioInput::open("/nonexistent/clip.mp4").is_err());
    }

    #[test]
    fn video_open_reports_metadata_for_sample() {
        let path = "tests/data/sample.mp4";
        if !std::path::Path::new(path).exists() {
            return; // Skip if test file doesn't exist
        }

        let input = VideoInput::open(path).unwrap();
        assert!(input.width() > 0);
        assert!(input.height() > 0);
        assert!(input.native_frame_rate() > 0.0);
    }

    #[test]
    fn decode_loops_back_after_seek_to_start() {
        let path = "tests/data/sample.mp4";
        if !std::path::Path::new(path).exists() {
            return;
        }

        let mut input = VideoInput::open(path).unwrap();
        let mut frame = DecodedFrame::default();

        assert_eq!(input.decode_next(&mut frame).unwrap(), DecodeStatus::Frame);
        let first_pts = frame.pts_secs;

        // Drain to end of stream.
        while input.decode_next(&mut frame).unwrap() == DecodeStatus::Frame {}

        input.seek_to_start().unwrap();
        assert_eq!(input.decode_next(&mut frame).unwrap(), DecodeStatus::Frame);
        assert!(
            (frame.pts_secs - first_pts).abs() < 0.5,
            "first frame after loop should be back near the start, got {}",
            frame.pts_secs
        );
    }
}

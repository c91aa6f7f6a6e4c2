// SPDX-License-Identifier: MPL-2.0
use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    Io(String),
    Config(String),
    Media(MediaError),
}

/// Specific error types for media loading and playback.
///
/// End-of-stream is deliberately not part of this taxonomy: it is a normal
/// playback event that triggers a seek back to the start, not a failure.
#[derive(Debug, Clone)]
pub enum MediaError {
    /// The file contains no decodable video stream, or its kind is unknown.
    /// Fatal to the load; the file is rejected.
    UnsupportedFormat,

    /// The codec of a found stream is not available in the linked FFmpeg.
    UnsupportedCodec(String),

    /// A single packet or frame failed to decode. Callers skip it and
    /// continue with the next packet.
    DecodeTransient(String),

    /// The audio device or stream could not be created. Audio is disabled
    /// for the current media; video is unaffected.
    SinkUnavailable(String),

    /// The file has no audio stream (only surfaced by audio-side probing).
    NoAudioStream,
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::UnsupportedFormat => write!(f, "No decodable video stream found"),
            MediaError::UnsupportedCodec(codec) => {
                write!(f, "Unsupported codec: {codec}")
            }
            MediaError::DecodeTransient(msg) => write!(f, "Decode error (transient): {msg}"),
            MediaError::SinkUnavailable(msg) => write!(f, "Audio sink unavailable: {msg}"),
            MediaError::NoAudioStream => write!(f, "No audio stream found"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O Error: {e}"),
            Error::Config(e) => write!(f, "Config Error: {e}"),
            Error::Media(e) => write!(f, "Media Error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<MediaError> for Error {
    fn from(err: MediaError) -> Self {
        Error::Media(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_io_error() {
        let err = Error::Io("disk failure".to_string());
        assert_eq!(format!("{}", err), "I/O Error: disk failure");
    }

    #[test]
    fn from_io_error_produces_io_variant() {
        let io_error = std::io::Error::other("boom");
        let err: Error = io_error.into();
        match err {
            Error::Io(message) => assert!(message.contains("boom")),
            _ => panic!("expected Io variant"),
        }
    }

    #[test]
    fn config_error_formats_properly() {
        let err = Error::Config("bad scaling mode".into());
        assert_eq!(format!("{}", err), "Config Error: bad scaling mode");
    }

    #[test]
    fn media_error_converts_to_error() {
        let err: Error = MediaError::UnsupportedFormat.into();
        assert!(matches!(err, Error::Media(MediaError::UnsupportedFormat)));
    }

    #[test]
    fn media_error_display() {
        let err = MediaError::UnsupportedCodec("AV1".to_string());
        assert!(format!("{}", err).contains("AV1"));

        let err = MediaError::SinkUnavailable("no default device".to_string());
        assert!(format!("{}", err).contains("no default device"));
    }

    #[test]
    fn transient_decode_error_keeps_message() {
        let err = MediaError::DecodeTransient("packet send failed".to_string());
        assert!(format!("{}", err).contains("packet send failed"));
    }
}

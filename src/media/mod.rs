// SPDX-License-Identifier: MPL-2.0
//! Media source classification.
//!
//! A [`MediaSource`] pairs a file path with its detected [`MediaKind`].
//! Classification is extension-based: the decoder validates the actual
//! contents later, so a mismatched extension fails at load time rather
//! than here.

use std::path::{Path, PathBuf};

/// Kind of media behind a file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Single still frame (jpg, png, bmp, tiff, webp).
    Image,

    /// Multi-frame image that loops (gif).
    AnimatedImage,

    /// Video container (mp4, avi, mkv, mov, webm, flv).
    Video,

    /// Extension not recognized. Rejected at load time.
    Unknown,
}

impl MediaKind {
    /// Detects the media kind from the file extension (case-insensitive).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
            return MediaKind::Unknown;
        };

        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "bmp" | "tiff" | "webp" => MediaKind::Image,
            "gif" => MediaKind::AnimatedImage,
            "mp4" | "avi" | "mkv" | "mov" | "webm" | "flv" => MediaKind::Video,
            _ => MediaKind::Unknown,
        }
    }

    /// Returns true for media that plays as a looping frame stream.
    #[must_use]
    pub fn is_animated(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::AnimatedImage)
    }
}

/// A loaded media file. Immutable once created; replacing the current
/// source tears down all decode state first (see `MediaPlayer::load_media`).
#[derive(Debug, Clone)]
pub struct MediaSource {
    path: PathBuf,
    kind: MediaKind,
}

impl MediaSource {
    /// Classifies the file at `path`. Does not open the file.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let kind = MediaKind::from_path(&path);
        Self { path, kind }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

/// Returns true if the file extension maps to a supported media kind.
pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
    MediaKind::from_path(path) != MediaKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_image_extensions() {
        assert_eq!(MediaKind::from_path("wall.jpg"), MediaKind::Image);
        assert_eq!(MediaKind::from_path("wall.jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::from_path("wall.png"), MediaKind::Image);
        assert_eq!(MediaKind::from_path("wall.bmp"), MediaKind::Image);
        assert_eq!(MediaKind::from_path("wall.tiff"), MediaKind::Image);
        assert_eq!(MediaKind::from_path("wall.webp"), MediaKind::Image);
    }

    #[test]
    fn detects_video_extensions() {
        assert_eq!(MediaKind::from_path("clip.mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_path("clip.avi"), MediaKind::Video);
        assert_eq!(MediaKind::from_path("clip.mkv"), MediaKind::Video);
        assert_eq!(MediaKind::from_path("clip.mov"), MediaKind::Video);
        assert_eq!(MediaKind::from_path("clip.webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_path("clip.flv"), MediaKind::Video);
    }

    #[test]
    fn gif_is_animated_image() {
        assert_eq!(MediaKind::from_path("loop.gif"), MediaKind::AnimatedImage);
        assert!(MediaKind::AnimatedImage.is_animated());
    }

    #[test]
    fn detection_is_case_insensitive() {
        assert_eq!(MediaKind::from_path("CLIP.MP4"), MediaKind::Video);
        assert_eq!(MediaKind::from_path("Wall.PNG"), MediaKind::Image);
        assert_eq!(MediaKind::from_path("Loop.GIF"), MediaKind::AnimatedImage);
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        assert_eq!(MediaKind::from_path("notes.txt"), MediaKind::Unknown);
        assert_eq!(MediaKind::from_path("noextension"), MediaKind::Unknown);
        assert!(!is_supported("archive.tar.gz"));
    }

    #[test]
    fn video_is_animated_but_image_is_not() {
        assert!(MediaKind::Video.is_animated());
        assert!(!MediaKind::Image.is_animated());
        assert!(!MediaKind::Unknown.is_animated());
    }

    #[test]
    fn media_source_keeps_path_and_kind() {
        let source = MediaSource::new("/backgrounds/ocean.mp4");
        assert_eq!(source.kind(), MediaKind::Video);
        assert_eq!(source.path(), Path::new("/backgrounds/ocean.mp4"));
    }
}

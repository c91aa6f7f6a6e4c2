// SPDX-License-Identifier: MPL-2.0
//! muralis turns an encoded media file (video, animated image or static
//! image) into a stream of correctly-timed, correctly-scaled pixel
//! buffers for an external presentation surface, with an independent
//! audio extraction/playback path.
//!
//! Surface/window creation, GPU contexts, CLI parsing and signal
//! handling live outside this crate; it consumes a
//! [`surface::PresentationSurface`] and an audio device through narrow
//! capability interfaces.

#![doc(html_root_url = "https://docs.rs/muralis/0.2.0")]

pub mod compositor;
pub mod config;
pub mod error;
pub mod media;
pub mod player;
pub mod surface;

#[cfg(test)]
pub(crate) mod test_utils;

pub use compositor::{composite, render_rect, FrameRef, PixelLayout, RenderRect, ScalingMode};
pub use error::{Error, MediaError, Result};
pub use media::{MediaKind, MediaSource};
pub use player::{DecodedFrame, MediaPlayer, PlaybackState, Volume};
pub use surface::PresentationSurface;

// SPDX-License-Identifier: MPL-2.0
//! Scaling compositor: pure pixel functions that map a decoded source
//! buffer onto a destination buffer of fixed dimensions.
//!
//! The same algorithm is shared by every destination surface type:
//! compute a render rectangle from the scaling mode, then run a
//! nearest-neighbor copy loop that clips per pixel. `Fill` intentionally
//! produces negative offsets (center-cropping); all other modes clamp
//! offsets so the render rectangle never leaves the destination. The
//! vertical flip is a property of the destination's coordinate convention
//! (top-down vs bottom-up surfaces), never of the scaling mode or media
//! kind, so it is taken as an explicit parameter.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest source dimension a surface is expected to accept. Sources
/// beyond this are downsampled before compositing instead of rejected.
pub const MAX_SOURCE_DIMENSION: u32 = 4096;

/// How a source buffer is scaled into the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingMode {
    /// Fill the whole destination, ignoring aspect ratio.
    Stretch,

    /// Preserve aspect ratio, fully contained (letterbox/pillarbox).
    Fit,

    /// Preserve aspect ratio, fully covering (center-crops overflow).
    Fill,

    /// The configuration literal `default`; composites exactly as `Fit`.
    Default,
}

impl Default for ScalingMode {
    fn default() -> Self {
        ScalingMode::Default
    }
}

impl FromStr for ScalingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stretch" => Ok(ScalingMode::Stretch),
            "fit" => Ok(ScalingMode::Fit),
            "fill" => Ok(ScalingMode::Fill),
            "default" => Ok(ScalingMode::Default),
            other => Err(Error::Config(format!(
                "invalid scaling mode '{other}' (expected stretch, fit, fill or default)"
            ))),
        }
    }
}

impl fmt::Display for ScalingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalingMode::Stretch => "stretch",
            ScalingMode::Fit => "fit",
            ScalingMode::Fill => "fill",
            ScalingMode::Default => "default",
        };
        write!(f, "{name}")
    }
}

/// Destination pixel byte order. The source is always tightly packed RGBA;
/// conversion happens during the copy loop, not as a separate pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// R, G, B, A byte order.
    Rgba,

    /// B, G, R, A byte order (little-endian ARGB words, e.g. SHM buffers).
    Bgra,
}

/// Borrowed view of a tightly packed RGBA source buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// Placement of the scaled source inside the destination. Offsets are
/// signed: `Fill` centers its overflow with negative offsets that the
/// copy loop clips per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRect {
    pub width: i64,
    pub height: i64,
    pub offset_x: i64,
    pub offset_y: i64,
}

/// Computes the render rectangle for a source/destination pair under the
/// given scaling mode.
///
/// Aspect comparisons and scaled dimensions use integer cross
/// multiplication, matching the truncating behavior of the per-pixel
/// coordinate mapping.
#[must_use]
pub fn render_rect(
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    mode: ScalingMode,
) -> RenderRect {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return RenderRect {
            width: 0,
            height: 0,
            offset_x: 0,
            offset_y: 0,
        };
    }

    let sw = i64::from(src_width);
    let sh = i64::from(src_height);
    let dw = i64::from(dst_width);
    let dh = i64::from(dst_height);

    // src_aspect > dst_aspect, without going through floats.
    let src_wider = sw * dh > dw * sh;

    let (mut width, mut height, mut offset_x, mut offset_y) = match mode {
        ScalingMode::Stretch => (dw, dh, 0, 0),
        ScalingMode::Fit | ScalingMode::Default => {
            if src_wider {
                // Scale to width, letterbox vertically.
                let height = dw * sh / sw;
                (dw, height, 0, (dh - height) / 2)
            } else {
                // Scale to height, pillarbox horizontally.
                let width = dh * sw / sh;
                (width, dh, (dw - width) / 2, 0)
            }
        }
        ScalingMode::Fill => {
            if src_wider {
                // Scale to height; horizontal overflow gets a negative
                // offset so the crop stays centered.
                let width = dh * sw / sh;
                (width, dh, -(width - dw) / 2, 0)
            } else {
                let height = dw * sh / sw;
                (dw, height, 0, -(height - dh) / 2)
            }
        }
    };

    // Fill relies on out-of-bounds coordinates being clipped per pixel;
    // clamping them here would break the centered crop. Every other mode
    // gets the safety clamp.
    if mode != ScalingMode::Fill {
        if offset_x < 0 {
            offset_x = 0;
        }
        if offset_y < 0 {
            offset_y = 0;
        }
        if width + offset_x > dw {
            width = dw - offset_x;
        }
        if height + offset_y > dh {
            height = dh - offset_y;
        }
    }

    RenderRect {
        width,
        height,
        offset_x,
        offset_y,
    }
}

/// Downsamples a source that exceeds `limit` in either dimension to fit
/// within `limit × limit`, preserving aspect ratio, using nearest-neighbor
/// sampling. Returns `None` when the source already fits.
///
/// `flip_vertically` mirrors the sampling exactly as the main copy loop
/// does, so callers that pre-shrink a source apply the flip here and then
/// composite without it.
#[must_use]
pub fn downsample_to_limit(
    src: FrameRef<'_>,
    limit: u32,
    flip_vertically: bool,
) -> Option<(Vec<u8>, u32, u32)> {
    if src.width <= limit && src.height <= limit {
        return None;
    }
    if src.width == 0 || src.height == 0 || src.data.len() < frame_len(src.width, src.height) {
        return None;
    }

    let sw = i64::from(src.width);
    let sh = i64::from(src.height);
    let out_width = if src.width >= src.height {
        i64::from(limit)
    } else {
        i64::from(limit) * sw / sh
    }
    .max(1);
    let out_height = if src.width >= src.height {
        i64::from(limit) * sh / sw
    } else {
        i64::from(limit)
    }
    .max(1);

    let mut out = vec![0u8; (out_width * out_height * 4) as usize];
    for y in 0..out_height {
        let mut src_y = y * sh / out_height;
        if flip_vertically {
            src_y = sh - 1 - src_y;
        }
        let src_y = src_y.clamp(0, sh - 1);
        for x in 0..out_width {
            let src_x = (x * sw / out_width).min(sw - 1);
            let si = ((src_y * sw + src_x) * 4) as usize;
            let di = ((y * out_width + x) * 4) as usize;
            out[di..di + 4].copy_from_slice(&src.data[si..si + 4]);
        }
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let (width, height) = (out_width as u32, out_height as u32);
    Some((out, width, height))
}

/// Composites `src` into `dst` under the given scaling mode.
///
/// Clears the destination to transparent black, then runs the per-pixel
/// copy with mandatory bounds checking (Fill's negative offsets produce
/// out-of-bounds coordinates by design) and byte-order conversion to
/// `layout`. Oversized sources are first downsampled to
/// [`MAX_SOURCE_DIMENSION`]; the vertical flip is applied exactly once,
/// either by the downsample step or by the copy loop.
pub fn composite(
    src: FrameRef<'_>,
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
    mode: ScalingMode,
    layout: PixelLayout,
    flip_vertically: bool,
) {
    let needed = frame_len(dst_width, dst_height);
    if dst.len() < needed {
        return;
    }
    dst[..needed].fill(0);

    if src.width == 0 || src.height == 0 || src.data.len() < frame_len(src.width, src.height) {
        return;
    }

    let shrunk = downsample_to_limit(src, MAX_SOURCE_DIMENSION, flip_vertically);
    let (source, flip) = match &shrunk {
        Some((data, width, height)) => (
            FrameRef {
                data,
                width: *width,
                height: *height,
            },
            false,
        ),
        None => (src, flip_vertically),
    };

    let rect = render_rect(source.width, source.height, dst_width, dst_height, mode);
    blit(source, dst, dst_width, dst_height, rect, layout, flip);
}

/// Byte length of a tightly packed RGBA buffer.
fn frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

fn blit(
    src: FrameRef<'_>,
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
    rect: RenderRect,
    layout: PixelLayout,
    flip_vertically: bool,
) {
    if rect.width <= 0 || rect.height <= 0 {
        return;
    }

    let sw = i64::from(src.width);
    let sh = i64::from(src.height);
    let dw = i64::from(dst_width);
    let dh = i64::from(dst_height);

    for y in 0..rect.height {
        let dst_y = y + rect.offset_y;
        if dst_y < 0 || dst_y >= dh {
            continue;
        }

        let mut src_y = y * sh / rect.height;
        if flip_vertically {
            src_y = sh - 1 - src_y;
        }
        let src_y = src_y.clamp(0, sh - 1);

        for x in 0..rect.width {
            let dst_x = x + rect.offset_x;
            if dst_x < 0 || dst_x >= dw {
                continue;
            }

            let src_x = (x * sw / rect.width).min(sw - 1);
            let si = ((src_y * sw + src_x) * 4) as usize;
            let di = ((dst_y * dw + dst_x) * 4) as usize;

            match layout {
                PixelLayout::Rgba => {
                    dst[di..di + 4].copy_from_slice(&src.data[si..si + 4]);
                }
                PixelLayout::Bgra => {
                    dst[di] = src.data[si + 2];
                    dst[di + 1] = src.data[si + 1];
                    dst[di + 2] = src.data[si];
                    dst[di + 3] = src.data[si + 3];
                }
            }
        }
    }
}

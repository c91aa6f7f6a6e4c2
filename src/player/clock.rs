// SPDX-License-Identifier: MPL-2.0
//! Playback clock: reconciles the decoder's native frame rate, the
//! user-requested display rate, and wall-clock time.
//!
//! Two pacing modes exist and deliberately stay separate. When the target
//! display rate is at or above the native rate, decode pacing anchors each
//! frame's presentation timestamp against wall-clock time. When the target
//! is below the native rate, decode runs unthrottled and pacing is owned
//! entirely by the display gate. Combining both waits compounds into
//! slow-motion playback, so exactly one of them is active at a time.

use std::time::{Duration, Instant};
use tracing::debug;

use super::decode::FALLBACK_FRAME_RATE;

/// Upper bound on a single anchor wait. Corrupt timestamps must not stall
/// the render thread indefinitely.
pub const MAX_FRAME_WAIT: Duration = Duration::from_millis(100);

/// Which component owns playback pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingMode {
    /// No effective rate limiting: decode waits on each frame's PTS so
    /// the video plays at its authored speed.
    NativeSpeed,

    /// The display rate is below the native rate: decode free-runs and
    /// `should_display_frame` alone decides when frames are shown.
    DisplayLimited,
}

/// Tracks native rate, target display rate and the wall-clock anchor.
///
/// Invariants: both rates are always > 0.
#[derive(Debug)]
pub struct PlaybackClock {
    native_rate: f64,
    target_rate: f64,
    anchor: Option<Instant>,
    last_display: Option<Instant>,
}

impl PlaybackClock {
    /// Creates a clock for a stream with the given native frame rate.
    /// Non-positive rates fall back to [`FALLBACK_FRAME_RATE`].
    #[must_use]
    pub fn new(native_rate: f64) -> Self {
        let native_rate = if native_rate > 0.0 {
            native_rate
        } else {
            FALLBACK_FRAME_RATE
        };
        Self {
            native_rate,
            target_rate: native_rate,
            anchor: None,
            last_display: None,
        }
    }

    #[must_use]
    pub fn native_rate(&self) -> f64 {
        self.native_rate
    }

    #[must_use]
    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    /// Sets the display rate limit. A rate ≤ 0 means "use the native
    /// frame rate" (no limiting).
    pub fn set_target_display_rate(&mut self, rate: f64) {
        let new_rate = if rate > 0.0 { rate } else { self.native_rate };
        if (new_rate - self.target_rate).abs() > f64::EPSILON {
            debug!(
                native = self.native_rate,
                target = new_rate,
                "display rate changed"
            );
        }
        self.target_rate = new_rate;
    }

    /// Returns which component currently owns pacing.
    #[must_use]
    pub fn pacing_mode(&self) -> PacingMode {
        if self.target_rate < self.native_rate {
            PacingMode::DisplayLimited
        } else {
            PacingMode::NativeSpeed
        }
    }

    /// Paces a freshly decoded frame against wall-clock time.
    ///
    /// In native-speed mode this sleeps until `anchor + pts`, clamped to
    /// [`MAX_FRAME_WAIT`]. In display-limited mode it returns immediately:
    /// waiting here as well as in the display gate would double-pace.
    /// The anchor is established on the first paced frame.
    pub fn pace(&mut self, pts_secs: f64) {
        if self.pacing_mode() == PacingMode::DisplayLimited {
            return;
        }

        let anchor = *self.anchor.get_or_insert_with(Instant::now);
        if pts_secs <= 0.0 {
            return;
        }

        let expected = anchor + Duration::from_secs_f64(pts_secs);
        let now = Instant::now();
        if expected > now {
            std::thread::sleep((expected - now).min(MAX_FRAME_WAIT));
        }
    }

    /// Resets the anchor after a loop back to the start of the stream.
    /// Without this, the wait computed against the stale anchor grows
    /// with every play-through.
    pub fn on_loop(&mut self) {
        self.anchor = Some(Instant::now());
    }

    /// Forgets all timing state (stop/unload).
    pub fn reset(&mut self) {
        self.anchor = None;
        self.last_display = None;
    }

    /// Returns true when enough wall-clock time has passed since the last
    /// true return to show a new frame at the target display rate.
    ///
    /// This is the single authority for "is it time to present"; the
    /// internal timer only resets on a true return. The first call after
    /// construction or [`reset`](Self::reset) fires immediately.
    pub fn should_display_frame(&mut self) -> bool {
        let interval = Duration::from_secs_f64(1.0 / self.target_rate);
        let now = Instant::now();

        match self.last_display {
            Some(last) if now.duration_since(last) < interval => false,
            _ => {
                self.last_display = Some(now);
                true
            }
        }
    }
}

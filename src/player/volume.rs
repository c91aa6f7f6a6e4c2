// SPDX-License-Identifier: MPL-2.0
//! Volume domain type for audio playback.
//!
//! A type-safe wrapper for volume percentages, ensuring they are always
//! within the valid range (0–100).

use serde::{Deserialize, Deserializer, Serialize};

/// Default playback volume in percent.
pub const DEFAULT_VOLUME_PERCENT: u8 = 100;

/// Volume step used by `increase`/`decrease`.
pub const VOLUME_STEP_PERCENT: i32 = 5;

/// Volume level in percent, guaranteed to be within 0–100.
///
/// This newtype enforces validity at the type level, making it impossible
/// to hand an out-of-range volume to the audio sink.
///
/// # Example
///
/// ```
/// use muralis::player::Volume;
///
/// let vol = Volume::new(50);
/// assert_eq!(vol.percent(), 50);
///
/// // Values outside range are clamped
/// let too_loud = Volume::new(250);
/// assert_eq!(too_loud.percent(), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Volume(u8);

impl Volume {
    /// Creates a new volume level, clamping to 0–100.
    #[must_use]
    pub fn new(percent: i32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let clamped = percent.clamp(0, 100) as u8;
        Self(clamped)
    }

    /// Returns the volume as a percentage (0–100).
    #[must_use]
    pub fn percent(self) -> u8 {
        self.0
    }

    /// Returns the volume as a linear gain factor (0.0–1.0) for the sink.
    #[must_use]
    pub fn as_scale(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Returns true if the volume is zero.
    #[must_use]
    pub fn is_silent(self) -> bool {
        self.0 == 0
    }

    /// Increases volume by one step, clamping to maximum.
    #[must_use]
    pub fn increase(self) -> Self {
        Self::new(i32::from(self.0) + VOLUME_STEP_PERCENT)
    }

    /// Decreases volume by one step, clamping to minimum.
    #[must_use]
    pub fn decrease(self) -> Self {
        Self::new(i32::from(self.0) - VOLUME_STEP_PERCENT)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(DEFAULT_VOLUME_PERCENT)
    }
}

impl<'de> Deserialize<'de> for Volume {
    /// Deserializes from any integer, clamping into range so a stray
    /// `volume = 150` in a settings file degrades gracefully.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = i32::deserialize(deserializer)?;
        Ok(Volume::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_abs_diff_eq;

    #[test]
    fn new_clamps_to_valid_range() {
        assert_eq!(Volume::new(-20).percent(), 0);
        assert_eq!(Volume::new(150).percent(), 100);
        assert_eq!(Volume::new(50).percent(), 50);
    }

    #[test]
    fn default_is_full_volume() {
        assert_eq!(Volume::default().percent(), DEFAULT_VOLUME_PERCENT);
    }

    #[test]
    fn as_scale_maps_percent_to_unit_range() {
        assert_abs_diff_eq!(Volume::new(0).as_scale(), 0.0);
        assert_abs_diff_eq!(Volume::new(50).as_scale(), 0.5);
        assert_abs_diff_eq!(Volume::new(100).as_scale(), 1.0);
    }

    #[test]
    fn is_silent_detects_zero() {
        assert!(Volume::new(0).is_silent());
        assert!(!Volume::new(1).is_silent());
    }

    #[test]
    fn increase_and_decrease_step_and_clamp() {
        let vol = Volume::new(50);
        assert_eq!(vol.increase().percent(), 55);
        assert_eq!(vol.decrease().percent(), 45);

        assert_eq!(Volume::new(100).increase().percent(), 100);
        assert_eq!(Volume::new(0).decrease().percent(), 0);
    }

    #[test]
    fn deserializes_with_clamping() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            v: Volume,
        }

        let wrapper: Wrapper = toml::from_str("v = 250").unwrap();
        assert_eq!(wrapper.v.percent(), 100);

        let wrapper: Wrapper = toml::from_str("v = -3").unwrap();
        assert_eq!(wrapper.v.percent(), 0);
    }
}

// SPDX-License-Identifier: MPL-2.0
//! Player settings: scaling mode, display rate limit, volume and mute.
//!
//! Settings are stored as a `settings.toml` file. The scaling mode is
//! configured with one of the literal strings `stretch`, `fit`, `fill` or
//! `default`; anything else is a load-time configuration error.
//!
//! # Examples
//!
//! ```no_run
//! use muralis::config::{self, PlayerSettings};
//!
//! // Load existing settings (defaults when no file exists)
//! let mut settings = config::load().unwrap_or_default();
//!
//! // Modify a setting
//! settings.display_rate = Some(30.0);
//!
//! // Save the modified settings
//! config::save(&settings).expect("Failed to save settings");
//! ```

use crate::compositor::ScalingMode;
use crate::error::Result;
use crate::player::Volume;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "muralis";

/// User-facing playback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSettings {
    /// How the media is scaled onto the destination surface.
    #[serde(default)]
    pub scaling: ScalingMode,

    /// Display rate limit in frames per second. `None` or a value ≤ 0
    /// means "use the media's native frame rate" (no limiting).
    #[serde(default)]
    pub display_rate: Option<f64>,

    /// Audio volume in percent (0–100).
    #[serde(default)]
    pub volume: Volume,

    /// Whether audio starts muted.
    #[serde(default)]
    pub muted: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            scaling: ScalingMode::default(),
            display_rate: None,
            volume: Volume::default(),
            muted: false,
        }
    }
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

pub fn load() -> Result<PlayerSettings> {
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(PlayerSettings::default())
}

pub fn save(settings: &PlayerSettings) -> Result<()> {
    if let Some(path) = get_default_config_path() {
        return save_to_path(settings, &path);
    }
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<PlayerSettings> {
    let contents = fs::read_to_string(path)?;
    let settings = toml::from_str(&contents)?;
    Ok(settings)
}

pub fn save_to_path(settings: &PlayerSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = toml::to_string_pretty(settings)?;
    fs::write(path, contents)?;
    Ok(())
}

// SPDX-License-Identifier: GPL-3.0-only

use crate::errors::{AppError, AppResult};
use crate::projection::ClipPlanes;
use crate::render::ParallaxSettings;
use crate::tracking::{Calibration, ScreenConfig, TrackingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Application directory name under the user config dir
pub const APP_DIR: &str = "virtual-window";
const CONFIG_FILE: &str = "config.json";

/// Persisted user configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Physical size of the display
    pub screen: ScreenConfig,
    /// Viewer calibration (screen width, baseline distance, IPD, smoothing)
    pub calibration: Calibration,
    /// Parallax rendering parameters
    pub parallax: ParallaxSettings,
    /// Face sample filtering
    pub tracking: TrackingConfig,
    /// Projection clip planes
    pub clip: ClipPlanes,
}

impl Config {
    /// Default location: `<config dir>/virtual-window/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No user config directory, using default configuration");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or unreadable file yields the defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&contents) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config");
                config.sanitized()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                Self::default()
            }
        }
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("No user config directory".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write pretty JSON to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Copy with every value clamped into its valid range.
    ///
    /// The screen width always follows the calibrated width; the stored
    /// screen only contributes its aspect ratio.
    pub fn sanitized(&self) -> Self {
        let calibration = self.calibration.clamped();
        let screen = if self.screen.is_valid() {
            self.screen
        } else {
            warn!(screen = ?self.screen, "Invalid screen size in config, using default");
            ScreenConfig::default()
        };
        let screen = if screen.width_cm == calibration.screen_width_cm {
            screen
        } else {
            ScreenConfig::from_calibration(&calibration, screen.aspect_ratio())
        };
        let clip = if self.clip.is_valid() {
            self.clip
        } else {
            warn!(clip = ?self.clip, "Invalid clip planes in config, using default");
            ClipPlanes::default()
        };

        Self {
            screen,
            calibration,
            parallax: self.parallax.sanitized(),
            tracking: self.tracking.clamped(),
            clip,
        }
    }
}

// src/config.rs

//! Configuration for the platform layer.
//!
//! Every section deserializes with defaults, so a config file only needs to
//! name the settings it changes. Configuration is read-only here; callers own
//! any persistence of their own settings.

use crate::error::PlatformError;
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming a JSON config file for [`CONFIG`].
pub const CONFIG_ENV_VAR: &str = "CASTAWAY_PLATFORM_CONFIG";

/// Process-wide configuration, loaded on first access.
pub static CONFIG: Lazy<PlatformConfig> = Lazy::new(PlatformConfig::from_env);

/// Root of the platform configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PlatformConfig {
    pub window: WindowConfig,
    pub audio: AudioConfig,
    pub display: DisplayConfig,
}

/// Defines basic window settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Logical surface width in pixels.
    pub width: u32,
    /// Logical surface height in pixels.
    pub height: u32,
    /// Enter fullscreen right after the window is created.
    pub fullscreen: bool,
    pub show_cursor: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            title: "Castaway".to_string(),
            width: 640,
            height: 480,
            fullscreen: false,
            show_cursor: true,
        }
    }
}

/// Audio output parameters. The sample format is always unsigned 8-bit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub frequency: u32,
    pub channels: u8,
    pub frames_per_buffer: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            frequency: 22050,
            channels: 1,
            frames_per_buffer: 1024,
        }
    }
}

/// Backend-specific display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Element id of the canvas used by the browser backend.
    pub canvas_id: String,
    /// Client area of the headless backend. Zero means "same as the window".
    pub headless_client_width: u32,
    pub headless_client_height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            canvas_id: "canvas".to_string(),
            headless_client_width: 0,
            headless_client_height: 0,
        }
    }
}

impl PlatformConfig {
    pub fn from_json_str(json: &str) -> Result<Self, PlatformError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlatformError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    fn from_env() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV_VAR) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded platform config from {}", path);
                config
            }
            Err(e) => {
                warn!("Ignoring config {}: {}. Using defaults.", path, e);
                Self::default()
            }
        }
    }
}

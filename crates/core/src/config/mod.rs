use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{framebuffer::SurfaceGeometry, Result, Rgb};

/// Top-level configuration structure for a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub display: DisplayConfig,
    pub timing: TimingConfig,
    pub sound: SoundConfig,
}

impl AppConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Settings for display surfaces and drawing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Surface used when a call does not name one; attached on creation.
    pub default_surface: String,
    pub geometry: SurfaceGeometry,
    pub default_color: Rgb,
    /// Colour of unlit cells and of the gaps between cells.
    pub background: Rgb,
    pub brightness: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_surface: "default".to_string(),
            geometry: SurfaceGeometry::default(),
            default_color: Rgb::RED,
            background: Rgb::BLACK,
            brightness: 255,
        }
    }
}

/// Durations that pace the command queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub text_speed_ms: u64,
    pub icon_duration_ms: u64,
    pub clear_delay_ms: u64,
    pub set_pixel_delay_ms: u64,
    pub tone_failure_delay_ms: u64,
    /// Completed commands kept for inspection.
    pub history_limit: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            text_speed_ms: 150,
            icon_duration_ms: 500,
            clear_delay_ms: 50,
            set_pixel_delay_ms: 10,
            tone_failure_delay_ms: 10,
            history_limit: 64,
        }
    }
}

impl TimingConfig {
    pub fn text_speed(&self) -> Duration {
        Duration::from_millis(self.text_speed_ms)
    }

    pub fn icon_duration(&self) -> Duration {
        Duration::from_millis(self.icon_duration_ms)
    }

    pub fn clear_delay(&self) -> Duration {
        Duration::from_millis(self.clear_delay_ms)
    }

    pub fn set_pixel_delay(&self) -> Duration {
        Duration::from_millis(self.set_pixel_delay_ms)
    }

    pub fn tone_failure_delay(&self) -> Duration {
        Duration::from_millis(self.tone_failure_delay_ms)
    }
}

/// Configuration specific to the tone subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    pub tempo_bpm: u32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self { tempo_bpm: 120 }
    }
}

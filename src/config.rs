//! Persistent application configuration
//!
//! Stores the gpiochip path, monitored channels, trigger lines and timing
//! knobs in a JSON file at `<config_dir>/echoruler/config.json`. Every
//! field has a default matching the reference rig, so a missing or
//! partial file still yields a runnable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sonar::channel::ChannelConfig;
use crate::sonar::event::ChannelId;

fn default_chip() -> String {
    "/dev/gpiochip0".to_string()
}

fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig {
            channel: 69,
            name: "length".to_string(),
            baseline_cm: 85.0,
        },
        ChannelConfig {
            channel: 75,
            name: "width".to_string(),
            baseline_cm: 47.0,
        },
        ChannelConfig {
            channel: 79,
            name: "height".to_string(),
            baseline_cm: 34.0,
        },
    ]
}

fn default_trigger_lines() -> Vec<ChannelId> {
    vec![73, 228, 229]
}

fn default_calibration() -> f64 {
    crate::DEFAULT_CALIBRATION_US_PER_CM
}

fn default_poll_timeout_ms() -> u64 {
    crate::DEFAULT_POLL_TIMEOUT_MS
}

fn default_trigger_pulse_us() -> u64 {
    crate::TRIGGER_PULSE_MICROS
}

fn default_trigger_spacing_ms() -> u64 {
    crate::TRIGGER_SPACING_MS
}

/// Persistent application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// GPIO chip device path
    #[serde(default = "default_chip")]
    pub chip: String,
    /// Monitored echo channels
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
    /// Trigger output line offsets, pulsed in order each cycle
    #[serde(default = "default_trigger_lines")]
    pub trigger_lines: Vec<ChannelId>,
    /// Echo calibration, round-trip microseconds per centimetre
    #[serde(default = "default_calibration")]
    pub calibration_us_per_cm: f64,
    /// Bounded wait per edge-event read, milliseconds
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Trigger pulse width, microseconds
    #[serde(default = "default_trigger_pulse_us")]
    pub trigger_pulse_us: u64,
    /// Spacing between per-channel trigger pulses, milliseconds
    #[serde(default = "default_trigger_spacing_ms")]
    pub trigger_spacing_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chip: default_chip(),
            channels: default_channels(),
            trigger_lines: default_trigger_lines(),
            calibration_us_per_cm: default_calibration(),
            poll_timeout_ms: default_poll_timeout_ms(),
            trigger_pulse_us: default_trigger_pulse_us(),
            trigger_spacing_ms: default_trigger_spacing_ms(),
        }
    }
}

impl AppConfig {
    /// Default config file path: `<config_dir>/echoruler/config.json`
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("echoruler")
            .join("config.json")
    }

    /// Load config from the default path, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded config from disk");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }

    /// Echo line offsets of all configured channels
    pub fn echo_lines(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|c| c.channel).collect()
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::DomainDescriptor;
use crate::snap::SnapType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub snap: SnapConfig,
    /// Domain override; when absent the engine is bounded by the driver limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fraction of the remaining distance closed per 1/60s frame, in (0, 1)
    #[serde(default = "default_lerp")]
    pub lerp: f64,
    /// Distance to target below which motion counts as arrived
    #[serde(default = "default_settle_epsilon")]
    pub settle_epsilon: f64,
    /// Position changes below this are not propagated through the signal
    #[serde(default = "default_signal_epsilon")]
    pub signal_epsilon: f64,
    /// Frame rate for hosts that pace frames themselves
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lerp: default_lerp(),
            settle_epsilon: default_settle_epsilon(),
            signal_epsilon: default_signal_epsilon(),
            frame_rate: default_frame_rate(),
        }
    }
}

impl EngineConfig {
    /// Interval between frames at the configured rate
    #[inline]
    pub fn frame_interval(&self) -> Duration {
        if self.frame_rate == 0 {
            Duration::from_millis(16) // ~60fps fallback
        } else {
            Duration::from_micros(1_000_000 / self.frame_rate as u64)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapConfig {
    /// Wrap the animator in a snap resolver once the host supplies a source
    #[serde(default)]
    pub enabled: bool,
    /// Query handed to the snap measurement source
    #[serde(default = "default_selector")]
    pub selector: String,
    /// "proximity" or "mandatory"
    #[serde(default, rename = "type")]
    pub snap_type: SnapType,
    /// Radius within which proximity snapping commits
    #[serde(default = "default_proximity")]
    pub proximity: f64,
    /// Share of the proximity radius under which motion counts as settling
    #[serde(default = "default_settle_factor")]
    pub settle_factor: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            selector: default_selector(),
            snap_type: SnapType::default(),
            proximity: default_proximity(),
            settle_factor: default_settle_factor(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lerp() -> f64 {
    0.1
}

fn default_settle_epsilon() -> f64 {
    0.25
}

fn default_signal_epsilon() -> f64 {
    crate::signal::DEFAULT_SIGNAL_EPSILON
}

fn default_frame_rate() -> u32 {
    60
}

fn default_selector() -> String {
    ".snap".to_string()
}

fn default_proximity() -> f64 {
    200.0
}

fn default_settle_factor() -> f64 {
    0.05
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from the default location or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(expand_tilde(path.as_ref()))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> crate::Result<()> {
        self.save_to(Self::config_path())
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let config_path = expand_tilde(path.as_ref());

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/scrollcraft/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("scrollcraft")
            .join("config.toml")
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        let lerp = self.engine.lerp;
        if !(lerp > 0.0 && lerp < 1.0) {
            return Err(crate::Error::InvalidLerp(lerp));
        }
        if !(self.engine.settle_epsilon.is_finite() && self.engine.settle_epsilon > 0.0) {
            return Err(crate::Error::Config(format!(
                "engine.settle_epsilon must be positive, got {}",
                self.engine.settle_epsilon
            )));
        }
        let proximity = self.snap.proximity;
        if !(proximity.is_finite() && proximity >= 0.0) {
            return Err(crate::Error::InvalidProximity(proximity));
        }
        if !(0.0..=1.0).contains(&self.snap.settle_factor) {
            return Err(crate::Error::Config(format!(
                "snap.settle_factor must be within [0, 1], got {}",
                self.snap.settle_factor
            )));
        }
        Ok(())
    }
}

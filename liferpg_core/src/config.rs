//! Configuration file support for Life RPG.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/liferpg/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub targets: TargetConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Countdown timing for a session
///
/// With `fast_forward` set, every planned duration (segments, rest and extra
/// rest alike) collapses to `fast_forward_seconds` and ticks fire every
/// `fast_forward_tick_millis`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,

    #[serde(default = "default_extra_rest_seconds")]
    pub extra_rest_seconds: u32,

    #[serde(default)]
    pub fast_forward: bool,

    #[serde(default = "default_fast_forward_seconds")]
    pub fast_forward_seconds: u32,

    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,

    #[serde(default = "default_fast_forward_tick_millis")]
    pub fast_forward_tick_millis: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rest_seconds: default_rest_seconds(),
            extra_rest_seconds: default_extra_rest_seconds(),
            fast_forward: false,
            fast_forward_seconds: default_fast_forward_seconds(),
            tick_millis: default_tick_millis(),
            fast_forward_tick_millis: default_fast_forward_tick_millis(),
        }
    }
}

impl SessionConfig {
    /// Duration a segment's countdown is armed with
    pub fn segment_seconds(&self, planned: u32) -> u32 {
        if self.fast_forward {
            planned.min(self.fast_forward_seconds)
        } else {
            planned
        }
    }

    pub fn rest_seconds(&self) -> u32 {
        self.segment_seconds(self.rest_seconds)
    }

    pub fn extra_rest_seconds(&self) -> u32 {
        self.segment_seconds(self.extra_rest_seconds)
    }

    /// Wall-clock interval between two ticks
    pub fn tick_cadence(&self) -> Duration {
        if self.fast_forward {
            Duration::from_millis(self.fast_forward_tick_millis)
        } else {
            Duration::from_millis(self.tick_millis)
        }
    }
}

/// Target recommendation and personal-best parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetConfig {
    /// How many recent sets feed the rolling average
    #[serde(default = "default_window")]
    pub window: usize,

    #[serde(default = "default_increment")]
    pub increment: u32,

    #[serde(default = "default_beginner_low")]
    pub beginner_low: u32,

    #[serde(default = "default_beginner_high")]
    pub beginner_high: u32,

    #[serde(default = "default_personal_best_margin")]
    pub personal_best_margin: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            increment: default_increment(),
            beginner_low: default_beginner_low(),
            beginner_high: default_beginner_high(),
            personal_best_margin: default_personal_best_margin(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("liferpg")
}

fn default_rest_seconds() -> u32 {
    20
}

fn default_extra_rest_seconds() -> u32 {
    15
}

fn default_fast_forward_seconds() -> u32 {
    1
}

fn default_tick_millis() -> u64 {
    1000
}

fn default_fast_forward_tick_millis() -> u64 {
    50
}

fn default_window() -> usize {
    3
}

fn default_increment() -> u32 {
    2
}

fn default_beginner_low() -> u32 {
    8
}

fn default_beginner_high() -> u32 {
    12
}

fn default_personal_best_margin() -> u32 {
    2
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("liferpg").join("config.toml")
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.targets.window == 0 {
            return Err(Error::Config("targets.window must be at least 1".into()));
        }
        if self.targets.beginner_low > self.targets.beginner_high {
            return Err(Error::Config(format!(
                "targets.beginner_low ({}) exceeds targets.beginner_high ({})",
                self.targets.beginner_low, self.targets.beginner_high
            )));
        }
        if self.session.tick_millis == 0 || self.session.fast_forward_tick_millis == 0 {
            return Err(Error::Config("tick cadence must be non-zero".into()));
        }
        Ok(())
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

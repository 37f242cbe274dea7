//! wallmountd configuration
//!
//! Loaded from a TOML file (`--config` or `WALLMOUNT_CONFIG`). Every section
//! and key is optional; CLI flags override file values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, WallmountError};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Default root directory holding `inbox/` and `static/`
pub const DEFAULT_ROOT_DIR: &str = "/usr/local/wallmountd";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WallmountConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub push: PushConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where staged versions and the live pointer live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT_DIR)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
        }
    }
}

/// Push protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Release reservations held longer than this (0 or absent: never)
    #[serde(default)]
    pub reservation_timeout_secs: Option<u64>,

    /// How often the watchdog checks reservation age
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval_secs: u64,
}

fn default_watchdog_interval() -> u64 {
    5
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            reservation_timeout_secs: None,
            watchdog_interval_secs: default_watchdog_interval(),
        }
    }
}

impl PushConfig {
    pub fn reservation_timeout(&self) -> Option<Duration> {
        match self.reservation_timeout_secs {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Container page settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_title")]
    pub title: String,

    /// How often display clients poll `/id`
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_title() -> String {
    "wallmount".to_string()
}

fn default_poll_interval() -> u64 {
    5000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl WallmountConfig {
    /// Load configuration from `path`, or defaults when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| WallmountError::ConfigError {
            message: format!("Failed to parse config: {}", e),
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| WallmountError::ConfigError {
            message: format!("Failed to serialize config: {}", e),
        })
    }
}

#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for sdkpack
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/sdkpack/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;

use serde::{Deserialize, Serialize};
use sdkpack_errors::{ConfigError, Error};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// Transfer task configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Bytes per chunk; zero or negative selects the default window
    #[serde(default = "default_window_size")]
    pub window_size: i64,
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub assets_path: Option<PathBuf>,
    pub tool_binary: Option<PathBuf>,
    #[serde(default = "default_tmp_dir_name")]
    pub tmp_dir_name: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            deadline_secs: default_deadline_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            assets_path: None,
            tool_binary: None,
            tmp_dir_name: default_tmp_dir_name(),
        }
    }
}

// Default value functions for serde
fn default_window_size() -> i64 {
    i64::try_from(constants::DEFAULT_WINDOW_SIZE).unwrap_or(1024)
}

fn default_deadline_secs() -> u64 {
    constants::DEFAULT_DEADLINE_SECS
}

fn default_poll_interval_ms() -> u64 {
    constants::DEFAULT_POLL_INTERVAL_MS
}

fn default_tick_interval_ms() -> u64 {
    constants::DEFAULT_TICK_INTERVAL_MS
}

fn default_tmp_dir_name() -> String {
    constants::TMP_DIR_NAME.to_string()
}

impl TransferConfig {
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("sdkpack").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or holds values that fail validation.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;
        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // SDKPACK_WINDOW_SIZE
        if let Ok(window) = std::env::var("SDKPACK_WINDOW_SIZE") {
            self.transfer.window_size = window.parse().map_err(|_| ConfigError::InvalidValue {
                field: "SDKPACK_WINDOW_SIZE".to_string(),
                value: window,
            })?;
        }

        // SDKPACK_DEADLINE_SECS
        if let Ok(deadline) = std::env::var("SDKPACK_DEADLINE_SECS") {
            self.transfer.deadline_secs =
                deadline.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "SDKPACK_DEADLINE_SECS".to_string(),
                    value: deadline,
                })?;
        }

        if let Ok(assets) = std::env::var("SDKPACK_ASSETS_PATH") {
            self.paths.assets_path = Some(PathBuf::from(assets));
        }

        if let Ok(tool) = std::env::var("SDKPACK_TOOL_BINARY") {
            self.paths.tool_binary = Some(PathBuf::from(tool));
        }

        self.validate()
    }

    /// Reject values that would make a transfer task unusable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.transfer.deadline_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transfer.deadline_secs".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.transfer.poll_interval() >= self.transfer.deadline() {
            return Err(ConfigError::InvalidValue {
                field: "transfer.poll_interval_ms".to_string(),
                value: self.transfer.poll_interval_ms.to_string(),
            }
            .into());
        }
        if self.transfer.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transfer.tick_interval_ms".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.paths.tmp_dir_name.is_empty() || self.paths.tmp_dir_name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                field: "paths.tmp_dir_name".to_string(),
                value: self.paths.tmp_dir_name.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Get the assets path
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` when no assets path is configured.
    pub fn assets_path(&self) -> Result<PathBuf, Error> {
        self.paths.assets_path.clone().ok_or_else(|| {
            ConfigError::MissingField {
                field: "assets_path".to_string(),
            }
            .into()
        })
    }

    /// Get the packaging tool binary
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` when no tool binary is configured.
    pub fn tool_binary(&self) -> Result<PathBuf, Error> {
        self.paths.tool_binary.clone().ok_or_else(|| {
            ConfigError::MissingField {
                field: "tool_binary".to_string(),
            }
            .into()
        })
    }
}

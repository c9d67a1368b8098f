//! Configuration management
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use sqlite_logger::config::Config;
//! use sqlite_logger::store::LogStore;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! let store = LogStore::from_config(&config).expect("Failed to open log store");
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `SQLITE_LOGGER__<section>__<key>`
//!
//! Examples:
//! - `SQLITE_LOGGER__STORAGE__LOG_FILE_DIR=/var/log/app`
//! - `SQLITE_LOGGER__RETENTION__SAVE_THRESHOLD=100`
//! - `SQLITE_LOGGER__RETENTION__MAX_AGE=7d`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/sqlite-logger.toml`.
//! This can be overridden using the `SQLITE_LOGGER_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{CaptureConfig, Config, RetentionConfig, StorageConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`SQLITE_LOGGER__*`)
    /// 2. TOML file (default: `config/sqlite-logger.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

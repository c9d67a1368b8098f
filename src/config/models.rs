use crate::humanize::HumanDuration;
use crate::models::LogLevel;
use crate::store::{
    DEFAULT_DELETE_INTERVAL, DEFAULT_FILE_NAME, DEFAULT_MAX_AGE, DEFAULT_SAVE_INTERVAL,
    DEFAULT_SAVE_THRESHOLD, RetentionPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Where the database file lives
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_log_file_dir")]
    pub log_file_dir: PathBuf,
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_file_dir: default_log_file_dir(),
            log_file_name: default_log_file_name(),
        }
    }
}

fn default_log_file_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

/// Flush and purge triggers. Durations accept `"60s"`, `"5m"`, `"5d"` or
/// integer seconds; zero disables the trigger.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_save_threshold")]
    pub save_threshold: usize,
    #[serde(default = "default_save_interval")]
    pub save_interval: HumanDuration,
    #[serde(default = "default_max_age")]
    pub max_age: HumanDuration,
    #[serde(default = "default_delete_interval")]
    pub delete_interval: HumanDuration,
    #[serde(default)]
    pub delete_on_every_save: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            save_threshold: default_save_threshold(),
            save_interval: default_save_interval(),
            max_age: default_max_age(),
            delete_interval: default_delete_interval(),
            delete_on_every_save: false,
        }
    }
}

fn default_save_threshold() -> usize {
    DEFAULT_SAVE_THRESHOLD
}

fn default_save_interval() -> HumanDuration {
    HumanDuration(DEFAULT_SAVE_INTERVAL)
}

fn default_max_age() -> HumanDuration {
    HumanDuration(DEFAULT_MAX_AGE)
}

fn default_delete_interval() -> HumanDuration {
    HumanDuration(DEFAULT_DELETE_INTERVAL)
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        RetentionPolicy {
            save_threshold: config.save_threshold,
            save_interval: config.save_interval.as_duration(),
            max_age: config.max_age.as_duration(),
            delete_interval: config.delete_interval.as_duration(),
            delete_on_every_save: config.delete_on_every_save,
        }
    }
}

/// Tracing capture settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    #[serde(default = "default_min_level")]
    pub min_level: LogLevel,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
        }
    }
}

fn default_min_level() -> LogLevel {
    LogLevel::Debug
}

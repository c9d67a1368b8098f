use super::models::Config;
use std::path::{MAIN_SEPARATOR, Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("log_file_name must not be empty")]
    EmptyFileName,

    #[error("log_file_name '{name}' must be a bare file name, not a path")]
    FileNameIsPath { name: String },

    #[error("delete_on_every_save requires a positive max_age")]
    PurgeWithoutMaxAge,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_storage(config)?;
    validate_retention(config)?;
    Ok(())
}

/// The file name is joined onto `log_file_dir`, so it must not escape it
fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    let name = config.storage.log_file_name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyFileName);
    }

    let has_separator = name.contains('/') || name.contains(MAIN_SEPARATOR);
    let is_relative_marker = name == "." || name == "..";
    if has_separator || is_relative_marker || Path::new(name).is_absolute() {
        return Err(ValidationError::FileNameIsPath {
            name: name.to_string(),
        });
    }

    Ok(())
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    if config.retention.delete_on_every_save && config.retention.max_age.is_zero() {
        return Err(ValidationError::PurgeWithoutMaxAge);
    }

    Ok(())
}

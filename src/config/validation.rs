use super::models::{Config, StorageProvider};
use thiserror::Error;

const MAX_TITLE_LEN_LIMIT: usize = 255;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Storage provider is S3 but missing credentials (access_key or secret_key)")]
    MissingS3Credentials,

    #[error("Storage provider is local but no root directory is configured")]
    MissingLocalRoot,

    #[error("Storage bucket name must not be empty")]
    EmptyBucket,

    #[error("progress_interval_ms must be positive")]
    InvalidProgressInterval,

    #[error("max_title_len must be between 1 and {limit}, got {actual}")]
    InvalidTitleLength { actual: usize, limit: usize },

    #[error("Import setting '{field}' must not be empty")]
    EmptyImportSetting { field: &'static str },

    #[error("Source timeout must be positive: {field} = {value}")]
    InvalidTimeout { field: &'static str, value: u64 },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_storage(config)?;
    validate_import(config)?;
    validate_source(config)?;
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.bucket.trim().is_empty() {
        return Err(ValidationError::EmptyBucket);
    }

    match config.storage.provider {
        StorageProvider::S3 => {
            if config.storage.access_key.is_none() || config.storage.secret_key.is_none() {
                return Err(ValidationError::MissingS3Credentials);
            }
        }
        StorageProvider::Local => {
            if config.storage.root.is_none() {
                return Err(ValidationError::MissingLocalRoot);
            }
        }
        StorageProvider::Memory => {}
    }

    Ok(())
}

fn validate_import(config: &Config) -> Result<(), ValidationError> {
    let import = &config.import;

    if import.progress_interval_ms == 0 {
        return Err(ValidationError::InvalidProgressInterval);
    }

    if import.max_title_len == 0 || import.max_title_len > MAX_TITLE_LEN_LIMIT {
        return Err(ValidationError::InvalidTitleLength {
            actual: import.max_title_len,
            limit: MAX_TITLE_LEN_LIMIT,
        });
    }

    if import.preferred_family.trim().is_empty() {
        return Err(ValidationError::EmptyImportSetting {
            field: "preferred_family",
        });
    }

    if import.fallback_name.trim().is_empty() {
        return Err(ValidationError::EmptyImportSetting {
            field: "fallback_name",
        });
    }

    Ok(())
}

fn validate_source(config: &Config) -> Result<(), ValidationError> {
    if config.source.connect_timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "connect_timeout_secs",
            value: 0,
        });
    }

    if config.source.request_timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "request_timeout_secs",
            value: 0,
        });
    }

    Ok(())
}

//! Configuration management for importbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use importbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Importing into bucket: {}", config.storage.bucket);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `IMPORTBOX__<section>__<key>`
//!
//! Examples:
//! - `IMPORTBOX__STORAGE__PROVIDER=s3`
//! - `IMPORTBOX__IMPORT__PREFERRED_FAMILY=webm`
//! - `IMPORTBOX__SOURCE__REQUEST_TIMEOUT_SECS=60`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/importbox.toml`.
//! This can be overridden using the `IMPORTBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, ImportConfig, SourceConfig, StorageConfig, StorageProvider};
pub use validation::ValidationError;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use std::sync::Arc;
use thiserror::Error;

use crate::storage::{MetadataMode, StorageClient};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to prepare storage directory: {0}")]
    StorageDirectory(#[from] std::io::Error),

    #[error("Failed to build storage backend: {0}")]
    StorageBackend(#[from] object_store::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`IMPORTBOX__*`)
    /// 2. TOML file (default: `config/importbox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

impl StorageConfig {
    /// Build the destination client for the configured provider
    ///
    /// The local provider creates its root directory when missing and keeps
    /// identity metadata in sidecar objects.
    pub fn build_client(&self) -> Result<StorageClient, ConfigError> {
        match self.provider {
            StorageProvider::Memory => Ok(StorageClient::in_memory()),
            StorageProvider::Local => {
                let root = self
                    .root
                    .clone()
                    .ok_or(ValidationError::MissingLocalRoot)?;
                std::fs::create_dir_all(&root)?;

                let store = LocalFileSystem::new_with_prefix(&root)?;
                tracing::info!(root = %root.display(), "Using local filesystem storage");

                Ok(StorageClient::new(
                    Arc::new(store),
                    self.bucket.clone(),
                    MetadataMode::Sidecar,
                ))
            }
            StorageProvider::S3 => {
                let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key)
                else {
                    return Err(ValidationError::MissingS3Credentials.into());
                };

                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(&self.bucket)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key);

                if let Some(region) = &self.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &self.endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }

                let store = builder.build()?;
                tracing::info!(bucket = %self.bucket, "Using S3 storage");

                Ok(StorageClient::new(
                    Arc::new(store),
                    self.bucket.clone(),
                    MetadataMode::Attributes,
                ))
            }
        }
    }
}

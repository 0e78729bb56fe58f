use crate::import::format::DEFAULT_PREFERRED_FAMILY;
use crate::import::naming::{DEFAULT_FALLBACK_NAME, DEFAULT_MAX_TITLE_LEN};
use crate::source::http::HttpConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

/// Storage provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Memory,
    #[default]
    Local,
    S3,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Directory backing the `local` provider
    #[serde(default = "default_root")]
    pub root: Option<PathBuf>,
    pub endpoint: Option<String>,
    /// S3 access key (loaded from environment, not from config file)
    #[serde(skip)]
    pub access_key: Option<String>,
    /// S3 secret key (loaded from environment, not from config file)
    #[serde(skip)]
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            bucket: default_bucket(),
            root: default_root(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            region: None,
        }
    }
}

fn default_bucket() -> String {
    "importbox-media".to_string()
}

fn default_root() -> Option<PathBuf> {
    Some(PathBuf::from("data/media"))
}

/// Import pipeline tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    /// Container family preferred when several audio encodings exist
    #[serde(default = "default_preferred_family")]
    pub preferred_family: String,
    /// Minimum spacing between `downloading` events
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    /// Sanitized titles are cut to this many characters
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,
    /// Base name used when a title sanitizes to nothing
    #[serde(default = "default_fallback_name")]
    pub fallback_name: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            preferred_family: default_preferred_family(),
            progress_interval_ms: default_progress_interval_ms(),
            max_title_len: default_max_title_len(),
            fallback_name: default_fallback_name(),
        }
    }
}

fn default_preferred_family() -> String {
    DEFAULT_PREFERRED_FAMILY.to_string()
}

fn default_progress_interval_ms() -> u64 {
    500
}

fn default_max_title_len() -> usize {
    DEFAULT_MAX_TITLE_LEN
}

fn default_fallback_name() -> String {
    DEFAULT_FALLBACK_NAME.to_string()
}

/// HTTP media source settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl SourceConfig {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("importbox/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.provider, StorageProvider::Local);
        assert_eq!(config.storage.bucket, "importbox-media");
        assert_eq!(config.import.preferred_family, "mp4");
        assert_eq!(config.import.progress_interval_ms, 500);
        assert_eq!(config.import.max_title_len, 80);
        assert_eq!(config.import.fallback_name, "imported-media");
    }

    #[test]
    fn test_http_config_conversion() {
        let source = SourceConfig {
            connect_timeout_secs: 3,
            request_timeout_secs: 60,
            user_agent: "test-agent".to_string(),
        };

        let http = source.http_config();
        assert_eq!(http.connect_timeout, Duration::from_secs(3));
        assert_eq!(http.request_timeout, Duration::from_secs(60));
        assert_eq!(http.user_agent, "test-agent");
    }

    #[test]
    fn test_provider_names() {
        let config: StorageConfig = toml::from_str(r#"provider = "memory""#).unwrap();
        assert_eq!(config.provider, StorageProvider::Memory);
        assert_eq!(config.bucket, "importbox-media");
    }
}

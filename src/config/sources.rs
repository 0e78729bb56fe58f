use super::models::Config;
use config::{ConfigError, Environment, File, Map};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "IMPORTBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/importbox.toml";
const ENV_PREFIX: &str = "IMPORTBOX";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    load_from_sources(default_path())
}

/// Path named by `IMPORTBOX_CONFIG`, or the default location
pub fn default_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// `.env` values overlaid by the process environment.
///
/// The `.env` file is read without exporting it, so the process environment
/// is never modified.
fn environment() -> Map<String, String> {
    let mut vars: Map<String, String> = dotenvy::dotenv_iter()
        .map(|iter| iter.filter_map(|item| item.ok()).collect())
        .unwrap_or_default();
    vars.extend(env::vars());
    vars
}

/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config, vars: &Map<String, String>) {
    let lookup = |primary: &str, fallback: &str| {
        vars.get(primary).or_else(|| vars.get(fallback)).cloned()
    };

    config.storage.access_key = lookup("S3_ACCESS_KEY", "AWS_ACCESS_KEY_ID");
    config.storage.secret_key = lookup("S3_SECRET_KEY", "AWS_SECRET_ACCESS_KEY");
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    load_with_environment(config_path, environment())
}

fn load_with_environment(
    config_path: PathBuf,
    vars: Map<String, String>,
) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // IMPORTBOX__IMPORT__MAX_TITLE_LEN -> import.max_title_len
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(Some(vars.clone())),
    );

    let mut config: Config = builder.build()?.try_deserialize()?;
    load_secrets(&mut config, &vars);
    Ok(config)
}

use crate::processing::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

const DEFAULT_STORAGE_BUCKET: &str = "documents";
const DEFAULT_STORAGE_DIR: &str = "uploads";

/// Runtime configuration for the ingestion services.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the PostgREST-compatible datastore.
    pub datastore_url: String,
    /// Optional API key sent to the datastore.
    pub datastore_api_key: Option<String>,
    /// Object-storage base URL; uploads go to `storage_dir` when unset.
    pub storage_url: Option<String>,
    /// Bucket receiving uploaded files.
    pub storage_bucket: String,
    /// Optional bearer token for object storage.
    pub storage_api_key: Option<String>,
    /// Local upload directory used without object storage.
    pub storage_dir: PathBuf,
    /// Remote extraction service for non-text formats.
    pub extraction_url: Option<String>,
    /// Attempt budget for the retry wrapper.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub retry_base_delay_ms: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            datastore_url: load_env("DATASTORE_URL")?,
            datastore_api_key: load_env_optional("DATASTORE_API_KEY"),
            storage_url: load_env_optional("STORAGE_URL"),
            storage_bucket: load_env_optional("STORAGE_BUCKET")
                .unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string()),
            storage_api_key: load_env_optional("STORAGE_API_KEY"),
            storage_dir: load_env_optional("STORAGE_DIR")
                .unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string())
                .into(),
            extraction_url: load_env_optional("EXTRACTION_URL"),
            max_retries: parse_optional("INGEST_MAX_RETRIES")?
                .unwrap_or(crate::processing::DEFAULT_MAX_ATTEMPTS),
            retry_base_delay_ms: parse_optional("INGEST_RETRY_BASE_DELAY_MS")?
                .unwrap_or(crate::processing::DEFAULT_BASE_DELAY.as_millis() as u64),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Retry schedule derived from `INGEST_MAX_RETRIES` and `INGEST_RETRY_BASE_DELAY_MS`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
            .with_base_delay(Duration::from_millis(self.retry_base_delay_ms))
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        datastore_url = %config.datastore_url,
        storage_url = ?config.storage_url,
        storage_dir = %config.storage_dir.display(),
        extraction_url = ?config.extraction_url,
        max_retries = config.max_retries,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

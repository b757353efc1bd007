//! Configuration management.
//!
//! Layered configuration: struct defaults, then a TOML file
//! (`config/tunedl.toml`, overridable via `TUNEDL_CONFIG`), then environment
//! variables with the pattern `TUNEDL__<SECTION>__<KEY>`, e.g.
//! `TUNEDL__SERVER__BIND_ADDR=0.0.0.0:9000` or
//! `TUNEDL__DOWNLOADER__COOKIES_PATH=/config/cookies.txt`.

mod models;
mod sources;

pub use models::{Config, DownloaderConfig, ServerConfig, StoreConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration invalid: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.downloader.languages.is_empty() {
        return Err(ConfigError::Invalid(
            "downloader.languages must list at least one language".to_string(),
        ));
    }
    if config.downloader.command.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "downloader.command must not be empty".to_string(),
        ));
    }
    Ok(())
}

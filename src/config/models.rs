use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            downloader: DownloaderConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:5800".parse().expect("valid default bind address")
}

/// Task store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/tasks")
}

/// External downloader invocation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    /// Command the executor spawns for each task
    #[serde(default = "default_command")]
    pub command: String,
    /// Where finished downloads land
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Parent of the per-task scratch directories
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Credentials/cookie file handed to the downloader
    #[serde(default = "default_cookies_path")]
    pub cookies_path: PathBuf,
    /// The downloader's own config file, editable through the settings API
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,
    /// Accepted language selectors for submitted tasks
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            output_dir: default_output_dir(),
            temp_dir: default_temp_dir(),
            cookies_path: default_cookies_path(),
            config_path: default_config_path(),
            languages: default_languages(),
        }
    }
}

fn default_command() -> String {
    "gamdl".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_cookies_path() -> PathBuf {
    PathBuf::from("config/cookies.txt")
}

fn default_config_path() -> PathBuf {
    PathBuf::from("config/config.ini")
}

fn default_languages() -> Vec<String> {
    vec!["zh-CN".to_string(), "en-US".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:5800");
        assert_eq!(config.store.path, PathBuf::from("data/tasks"));
        assert_eq!(config.downloader.command, "gamdl");
        assert_eq!(
            config.downloader.config_path,
            PathBuf::from("config/config.ini")
        );
        assert_eq!(
            config.downloader.languages,
            vec!["zh-CN".to_string(), "en-US".to_string()]
        );
    }
}

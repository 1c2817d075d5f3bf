//! Configuration management for AIHub Fetcher
//!
//! This module provides unified configuration management with automatic
//! first-run initialization and zero-config defaults. Settings live in a
//! TOML file next to the credential store; a missing file is written out
//! with defaults on first use so users have something to edit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::ClientConfig;
use crate::constants::{credentials, http, limits};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Download behavior defaults
    pub download: DownloadConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Request timeout (e.g., "60s")
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout (e.g., "30s")
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Rate limit in requests per second
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// Download behavior defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfigToml {
    /// Default output directory when none is given on the command line
    pub output_dir: Option<PathBuf>,
    /// Keep the tar archive after extraction
    pub keep_archive: bool,
}

impl Default for DownloadConfigToml {
    fn default() -> Self {
        Self {
            output_dir: None,
            keep_archive: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub default_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Path of the config file at the platform's config location
    pub fn default_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir
            .join(credentials::CONFIG_DIR_NAME)
            .join(credentials::CONFIG_FILE_NAME))
    }

    /// Load configuration, initializing the default file on first run.
    ///
    /// An explicitly given path must exist and parse. With no explicit
    /// path, a missing default file is created with default contents.
    pub fn load_or_init(explicit_path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        let path = Self::default_path()?;
        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.write_to(&path)?;
            info!("Wrote default configuration to {}", path.display());
            Ok(config)
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Serialize this configuration to a TOML file
    pub fn write_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        std::fs::write(path, rendered)?;
        Ok(())
    }

    /// Materialize the HTTP client configuration
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.client.request_timeout,
            connect_timeout: self.client.connect_timeout,
            rate_limit_rps: self.client.rate_limit_rps,
            ..ClientConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.client.request_timeout, http::DEFAULT_TIMEOUT);
        assert!(!config.download.keep_archive);
        assert_eq!(config.logging.default_level, "warn");
    }

    #[test]
    fn test_write_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.client.rate_limit_rps = 2;
        config.download.keep_archive = true;
        config.write_to(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.client.rate_limit_rps, 2);
        assert!(loaded.download.keep_archive);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[client]\nrate_limit_rps = 1\n").unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.client.rate_limit_rps, 1);
        // Unspecified sections and fields keep their defaults
        assert_eq!(loaded.client.connect_timeout, http::CONNECT_TIMEOUT);
        assert!(!loaded.download.keep_archive);
    }

    #[test]
    fn test_humantime_durations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[client]\nrequest_timeout = \"2m\"\nconnect_timeout = \"5s\"\n",
        )
        .unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.client.request_timeout, Duration::from_secs(120));
        assert_eq!(loaded.client.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load_or_init(Some(&missing)).is_err());
    }

    #[test]
    fn test_client_config_materialization() {
        let mut config = AppConfig::default();
        config.client.rate_limit_rps = 9;
        let client_config = config.client_config();
        assert_eq!(client_config.rate_limit_rps, 9);
        // Non-TOML fields keep library defaults
        assert!(client_config.tcp_nodelay);
    }
}

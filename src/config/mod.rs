//! Configuration management for the availability service
//!
//! Settings come from a TOML file or from environment variables; both
//! paths end in [`Config::validate`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use crate::coordinator::config::ServerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Vehicle registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Vehicle registry (resource registry) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// GraphQL endpoint of the vehicle service
    pub url: String,

    /// Whole-request timeout in milliseconds; mandatory and non-zero
    pub timeout_ms: u64,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: String::from("http://127.0.0.1:8000/graphql"),
            timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/availability.db"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },
}

/// Read and parse an optional environment variable; set but unparsable is an error
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let mut server = defaults.server;
        if let Some(addr) = env_parse("FLEET_BIND_ADDRESS")? {
            server.bind_address = addr;
        }
        if let Some(enable) = env_parse::<bool>("FLEET_ENABLE_CORS")? {
            server.enable_cors = enable;
        }

        let registry = RegistryConfig {
            url: std::env::var("VEHICLE_SERVICE_URL").unwrap_or(defaults.registry.url),
            timeout_ms: env_parse("FLEET_REGISTRY_TIMEOUT_MS")?
                .unwrap_or(defaults.registry.timeout_ms),
            connect_timeout_ms: env_parse("FLEET_REGISTRY_CONNECT_TIMEOUT_MS")?
                .unwrap_or(defaults.registry.connect_timeout_ms),
        };

        let database = DatabaseConfig {
            sqlite_path: std::env::var("FLEET_SQLITE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database.sqlite_path),
        };

        let logging = LoggingConfig {
            level: std::env::var("FLEET_LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: std::env::var("FLEET_LOG_FORMAT").unwrap_or(defaults.logging.format),
        };

        let config = Self {
            server,
            registry,
            database,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let url = url::Url::parse(&self.registry.url).map_err(|e| ConfigError::InvalidValue {
            field: "registry.url".to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "registry.url".to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.registry.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "registry.timeout_ms".to_string(),
                reason: "registry calls must be bounded by a non-zero timeout".to_string(),
            });
        }

        if self.registry.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "registry.connect_timeout_ms".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.database.sqlite_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.sqlite_path".to_string(),
            });
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format".to_string(),
                reason: format!("expected 'text' or 'json', got '{}'", self.logging.format),
            });
        }

        Ok(())
    }
}

//! HTTP server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::config::ConfigError;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8001";

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8001))
}

fn default_true() -> bool {
    true
}

/// Configuration for the availability HTTP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable permissive CORS for browser clients
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Enable request logging
    #[serde(default = "default_true")]
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    bind_address: Option<SocketAddr>,
    enable_cors: Option<bool>,
    enable_request_logging: Option<bool>,
}

impl ServerConfigBuilder {
    /// Set bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    /// Set bind address from string
    pub fn bind_address_str(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.bind_address = Some(addr.parse().map_err(|_| ConfigError::InvalidValue {
            field: "server.bind_address".to_string(),
            reason: format!(
                "invalid address: {addr} (expected host:port such as {DEFAULT_BIND_ADDRESS})"
            ),
        })?);
        Ok(self)
    }

    /// Enable/disable CORS
    pub fn enable_cors(mut self, enable: bool) -> Self {
        self.enable_cors = Some(enable);
        self
    }

    /// Enable/disable request logging
    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.enable_request_logging = Some(enable);
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig {
            bind_address: self.bind_address.unwrap_or_else(default_bind_address),
            enable_cors: self.enable_cors.unwrap_or(true),
            enable_request_logging: self.enable_request_logging.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.port(), 8001);
        assert!(config.enable_cors);
        assert!(config.enable_request_logging);
        assert_eq!(config.bind_address.to_string(), DEFAULT_BIND_ADDRESS);
    }

    #[test]
    fn test_config_builder_with_address() {
        let config = ServerConfig::builder()
            .bind_address_str("127.0.0.1:9000")
            .unwrap()
            .enable_cors(false)
            .build();

        assert_eq!(config.bind_address.port(), 9000);
        assert!(!config.enable_cors);
        assert!(config.enable_request_logging);
    }

    #[test]
    fn test_invalid_address() {
        assert!(ServerConfig::builder().bind_address_str("not-an-address").is_err());
    }
}

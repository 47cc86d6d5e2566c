//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to.
    /// Override: `HTTPCAST_BIND_PORT`
    pub bind_port: u16,

    /// Address to bind the HTTP server to.
    /// Override: `HTTPCAST_BIND_ADDRESS`
    pub bind_address: IpAddr,

    /// Maximum number of simultaneous connections admitted by the protocol
    /// singleton. Defaults to the protocol's fixed admission cap; overridable
    /// for testing a saturated admission path.
    /// Override: `HTTPCAST_MAX_CONNECTIONS`
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_port: 4714,
            bind_address: IpAddr::from([0, 0, 0, 0]),
            max_connections: httpcast_core::protocol_constants::MAX_CONNECTIONS,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HTTPCAST_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("HTTPCAST_BIND_ADDRESS") {
            if let Ok(addr) = val.parse() {
                self.bind_address = addr;
            }
        }

        if let Ok(val) = std::env::var("HTTPCAST_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                self.max_connections = max;
            }
        }
    }
}

//! Configuration file parsing for the server.
//!
//! Loads settings from TOML files including bind address, database target
//! and sweeper timing, then applies environment overrides.

use profilepool_sweeper::SweeperConfig;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Environment variable overriding the listen port
pub const ENV_PORT: &str = "PROFILEPOOL_PORT";

/// Environment variable overriding the database target
pub const ENV_DATABASE: &str = "PROFILEPOOL_DATABASE";

/// Environment variable overriding the lock staleness threshold
pub const ENV_UNLOCK_TIMEOUT_MS: &str = "PROFILEPOOL_UNLOCK_TIMEOUT_MS";

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Field present but unusable
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Offending field or variable
        field: String,
        /// What is wrong with it
        message: String,
    },
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (default: 8080)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// SQLite database path, or ":memory:"
    #[serde(default = "default_database")]
    pub database: String,

    /// Unlock sweeper settings
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_database() -> String {
    "profilepool.db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            database: default_database(),
            sweeper: SweeperConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for tests: in-memory store, ephemeral port
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 0,
            database: ":memory:".to_string(),
            sweeper: SweeperConfig::default(),
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.bind_port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: ENV_PORT.to_string(),
                message: format!("'{}' is not a port number", port),
            })?;
        }

        if let Some(database) = lookup(ENV_DATABASE) {
            self.database = database;
        }

        if let Some(timeout) = lookup(ENV_UNLOCK_TIMEOUT_MS) {
            self.sweeper.unlock_timeout_ms =
                timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_UNLOCK_TIMEOUT_MS.to_string(),
                    message: format!("'{}' is not a number of milliseconds", timeout),
                })?;
        }

        self.validate()
    }

    /// Check required fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField("database".to_string()));
        }

        if self.sweeper.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sweeper.sweep_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

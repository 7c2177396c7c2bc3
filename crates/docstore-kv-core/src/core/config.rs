//! Configuration for the key-value adapter
//!
//! Configuration is read from a TOML file (every section optional), then
//! overridden from the environment. The server applies command line
//! overrides on top and calls [`Config::validate`] before starting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use tracing::debug;

use crate::constants::{CONNECTION_STRING_ENV, DEFAULT_DATABASE};
use crate::types::{Error, Result};

/// Available document backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// MongoDB cluster reached through a connection string
    Mongo,
    /// In-process storage, lost on restart
    Memory,
}

impl std::str::FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mongo" | "mongodb" => Ok(BackendType::Mongo),
            "memory" => Ok(BackendType::Memory),
            other => Err(Error::config(format!(
                "Invalid storage backend: {}. Valid options: mongo, memory",
                other
            ))),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output
    Pretty,
    /// Single-line output
    Compact,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: SocketAddr,
}

/// Storage configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend type
    pub backend: BackendType,

    /// Cluster connection string, required by the mongo backend
    pub connection_string: Option<String>,

    /// Database holding one collection per store
    pub database: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, compact)
    pub format: LogFormat,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose Prometheus metrics on the HTTP server
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Mongo,
            connection_string: None,
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

// Keeps credentials embedded in the connection string out of debug output
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field(
                "connection_string",
                &self.connection_string.as_deref().map(redact_connection_string),
            )
            .field("database", &self.database)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from an optional file, then apply environment overrides.
    ///
    /// A file that was named but cannot be read or parsed is an error; only
    /// an absent path falls back to defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(CONNECTION_STRING_ENV) {
            self.storage.connection_string = Some(uri);
        }

        if let Some(database) = lookup("KV_DATABASE") {
            self.storage.database = database;
        }

        if let Some(backend) = lookup("KV_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }

        if let Some(addr) = lookup("KV_HTTP_ADDR") {
            self.server.http_addr = addr
                .parse()
                .map_err(|e| Error::config(format!("Invalid HTTP address: {}", e)))?;
        }

        if let Some(level) = lookup("KV_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(Error::config(format!("Invalid log level: {}", other))),
        }

        let database = &self.storage.database;
        if database.is_empty() {
            return Err(Error::config("Database name must not be empty"));
        }
        if let Some(c) = database
            .chars()
            .find(|c| matches!(c, '/' | '\\' | '.' | ' ' | '"' | '$' | '\0'))
        {
            return Err(Error::config(format!(
                "Database name {:?} contains invalid character {:?}",
                database, c
            )));
        }

        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &str) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read config file {}: {}", path, e)))?;

    let config = toml::from_str(&contents)
        .map_err(|e| Error::config(format!("Failed to parse config file {}: {}", path, e)))?;
    debug!("Loaded configuration from: {}", path);
    Ok(config)
}

/// Replace the user-info part of a connection string so it can be logged
pub fn redact_connection_string(uri: &str) -> String {
    let Some(scheme_end) = uri.find("://") else {
        return uri.to_string();
    };
    let authority_start = scheme_end + 3;
    let authority_end = uri[authority_start..]
        .find(['/', '?'])
        .map(|i| authority_start + i)
        .unwrap_or(uri.len());

    match uri[authority_start..authority_end].rfind('@') {
        Some(at) => format!(
            "{}***{}",
            &uri[..authority_start],
            &uri[authority_start + at..]
        ),
        None => uri.to_string(),
    }
}

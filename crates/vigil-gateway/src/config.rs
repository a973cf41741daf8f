//! Layered gateway configuration.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML config file,
//! environment variables, CLI flags. Every section is optional; a missing
//! file yields the defaults.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use vigil_core::DEFAULT_TTL_MINUTES;

/// Environment variable overriding the ingest token.
pub const INGEST_TOKEN_ENV: &str = "VIGIL_INGEST_TOKEN";
/// Environment variable overriding the admin token.
pub const ADMIN_TOKEN_ENV: &str = "VIGIL_ADMIN_TOKEN";

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The file that failed.
        path: PathBuf,
        /// The underlying TOML error.
        source: toml::de::Error,
    },
    /// A listen address did not parse.
    #[error("invalid listen address {addr}: {source}")]
    ListenAddr {
        /// The offending address string.
        addr: String,
        /// The underlying parse error.
        source: std::net::AddrParseError,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP surface settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[gateway]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GatewayConfig {
    /// Address to bind the HTTP listener to.
    pub listen_addr: String,
    /// Shared token the indexer presents on the ingestion webhook.
    ///
    /// Ingestion is disabled while unset.
    pub ingest_token: Option<String>,
    /// Shared token guarding approval decisions and policy administration.
    ///
    /// Policy writes are disabled while unset.
    pub admin_token: Option<String>,
    /// Default TTL for pending approval requests, in minutes.
    pub default_ttl_minutes: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8450".to_string(),
            ingest_token: None,
            admin_token: None,
            default_ttl_minutes: DEFAULT_TTL_MINUTES,
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StorageConfig {
    /// Directory for the embedded database files.
    pub data_dir: PathBuf,
    /// Run entirely in memory; nothing survives a restart.
    pub memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./vigil-data"),
            memory: false,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,vigil=debug".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(INGEST_TOKEN_ENV) {
            if !token.is_empty() {
                self.gateway.ingest_token = Some(token);
            }
        }
        if let Ok(token) = std::env::var(ADMIN_TOKEN_ENV) {
            if !token.is_empty() {
                self.gateway.admin_token = Some(token);
            }
        }
        self
    }

    /// The parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ListenAddr`] when the configured address does
    /// not parse.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.gateway
            .listen_addr
            .parse()
            .map_err(|source| ConfigError::ListenAddr {
                addr: self.gateway.listen_addr.clone(),
                source,
            })
    }
}

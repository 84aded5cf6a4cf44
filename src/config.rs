//! Application configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. a TOML file (first command-line argument or `BULWARK_CONFIG`)
//! 3. a `.env` file in the working directory
//! 4. process environment
//!
//! | Variable | Setting |
//! |---|---|
//! | `BULWARK_HOST` / `BULWARK_PORT` | listen address |
//! | `DATABASE_URL` (and `DATABASE_*`) | token store connection |
//! | `BULWARK_IDENTIFIER_HEADER` | client identifier header |
//! | `BULWARK_MISSING_IDENTIFIER` | `reject` or `shared_bucket` |
//! | `BULWARK_LOG_LEVEL` / `BULWARK_LOG_FORMAT` | logging |

use bulwark_core::logging::LogConfig;
use bulwark_csrf::{CsrfConfig, CsrfError, DatabaseConfig, MissingIdentifierPolicy};
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Csrf(#[from] CsrfError),

    #[error(transparent)]
    Server(#[from] bulwark_core::Error),
}

/// Listen address
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Resolve `host:port` to a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| AppError::Config(format!("invalid listen address {}: {}", self.host, e)))?
            .next()
            .ok_or_else(|| AppError::Config(format!("{} resolved to no address", self.host)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub csrf: CsrfConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load from every source. `path` overrides `BULWARK_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // Ignore if .env doesn't exist

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("BULWARK_CONFIG").map(PathBuf::from));

        let config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.merge_env(|key| std::env::var(key).ok())
    }

    /// Parse a TOML file; missing sections keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides and validate the result.
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        if let Some(host) = lookup("BULWARK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("BULWARK_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| AppError::Config(format!("invalid BULWARK_PORT '{}'", port)))?;
        }

        if let Some(header) = lookup("BULWARK_IDENTIFIER_HEADER") {
            self.csrf.identifier_header = header;
        }
        if let Some(policy) = lookup("BULWARK_MISSING_IDENTIFIER") {
            self.csrf.missing_identifier = MissingIdentifierPolicy::parse(&policy).ok_or_else(|| {
                AppError::Config(format!("invalid BULWARK_MISSING_IDENTIFIER '{}'", policy))
            })?;
        }

        self.database = self.database.merge_env(&lookup)?;
        self.log = self.log.merge_env(&lookup);

        self.csrf.validate()?;
        Ok(self)
    }
}

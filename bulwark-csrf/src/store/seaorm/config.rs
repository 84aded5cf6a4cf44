use crate::error::{CsrfError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default database: a SQLite file next to the process
pub const DEFAULT_DATABASE_URL: &str = "sqlite://bulwark.db?mode=rwc";

/// Idle timeout and max lifetime for the single in-memory SQLite connection.
/// Closing that connection drops the database, so it must outlive the process.
pub const MEMORY_CONNECTION_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

/// Connection settings for the SQL token store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,

    /// Maximum pool size
    pub max_connections: u32,

    /// Minimum pool size
    pub min_connections: u32,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,

    /// Log every statement through SQLx
    pub sqlx_logging: bool,

    /// Create the `token` table on connect
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_URL)
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            sqlx_logging: false,
            run_migrations: true,
        }
    }

    /// Process-local SQLite database, one pooled connection
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    /// Read `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`,
    /// `DATABASE_MIN_CONNECTIONS`, `DATABASE_CONNECT_TIMEOUT` and
    /// `DATABASE_SQLX_LOGGING` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("DATABASE_URL") {
            self.url = url;
        }

        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.max_connections = max
                .parse()
                .map_err(|_| CsrfError::Config("Invalid DATABASE_MAX_CONNECTIONS".into()))?;
        }

        if let Some(min) = lookup("DATABASE_MIN_CONNECTIONS") {
            self.min_connections = min
                .parse()
                .map_err(|_| CsrfError::Config("Invalid DATABASE_MIN_CONNECTIONS".into()))?;
        }

        if let Some(timeout) = lookup("DATABASE_CONNECT_TIMEOUT") {
            self.connect_timeout_secs = timeout
                .parse()
                .map_err(|_| CsrfError::Config("Invalid DATABASE_CONNECT_TIMEOUT".into()))?;
        }

        if let Some(logging) = lookup("DATABASE_SQLX_LOGGING") {
            self.sqlx_logging = logging == "true" || logging == "1";
        }

        Ok(self)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn sqlx_logging(mut self, enabled: bool) -> Self {
        self.sqlx_logging = enabled;
        self
    }

    pub fn run_migrations(mut self, enabled: bool) -> Self {
        self.run_migrations = enabled;
        self
    }

    /// Whether the URL names an in-memory SQLite database
    pub fn is_sqlite_memory(&self) -> bool {
        self.url.starts_with("sqlite::memory:") || self.url.contains("mode=memory")
    }

    /// Convert to SeaORM ConnectOptions.
    pub fn to_connect_options(&self) -> sea_orm::ConnectOptions {
        let mut options = sea_orm::ConnectOptions::new(&self.url);
        options
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .sqlx_logging(self.sqlx_logging);

        // Every in-memory SQLite connection is its own database.
        if self.is_sqlite_memory() {
            options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(MEMORY_CONNECTION_LIFETIME)
                .max_lifetime(MEMORY_CONNECTION_LIFETIME);
        } else {
            options
                .max_connections(self.max_connections)
                .min_connections(self.min_connections)
                .idle_timeout(Duration::from_secs(self.idle_timeout_secs));
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 10);
        assert!(config.run_migrations);
        assert!(!config.is_sqlite_memory());
    }

    #[test]
    fn test_in_memory_pins_pool() {
        let config = DatabaseConfig::in_memory().max_connections(8);
        assert!(config.is_sqlite_memory());

        let options = config.to_connect_options();
        assert_eq!(options.get_max_connections(), Some(1));
        assert_eq!(options.get_min_connections(), Some(1));
        assert_eq!(options.get_idle_timeout(), Some(MEMORY_CONNECTION_LIFETIME));
        assert_eq!(options.get_max_lifetime(), Some(MEMORY_CONNECTION_LIFETIME));
    }

    #[test]
    fn test_merge_env() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://localhost/bulwark"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("DATABASE_SQLX_LOGGING", "1"),
        ]
        .into();
        let config = DatabaseConfig::default()
            .merge_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.url, "postgres://localhost/bulwark");
        assert_eq!(config.max_connections, 25);
        assert!(config.sqlx_logging);
    }

    #[test]
    fn test_merge_env_rejects_bad_numbers() {
        let result = DatabaseConfig::default().merge_env(|k| {
            (k == "DATABASE_MIN_CONNECTIONS").then(|| "several".to_string())
        });
        assert!(matches!(result, Err(CsrfError::Config(_))));
    }
}

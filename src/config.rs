//! Configuration handling for the data layer.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use clap::Parser;
use std::time::Duration;
use url::Url;

pub const DEFAULT_APP_NAME: &str = "app";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "data-layer",
    about = "Relational data access layer with transactional scopes and cache-aside reads",
    version,
    author
)]
pub struct Config {
    /// PostgreSQL connection URL
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: String,

    /// Application name, used to namespace cache keys ("<app>::<cache>")
    #[arg(long, default_value = DEFAULT_APP_NAME, env = "APP_NAME")]
    pub app_name: String,

    /// Maximum number of pooled connections
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        env = "DB_MAX_CONNECTIONS"
    )]
    pub max_connections: u32,

    /// Minimum number of idle connections kept in the pool
    #[arg(
        long,
        default_value_t = DEFAULT_MIN_CONNECTIONS,
        env = "DB_MIN_CONNECTIONS"
    )]
    pub min_connections: u32,

    /// Redis URL for the shared cache. Caching is disabled when unset.
    #[arg(long, value_name = "URL", env = "CACHE_URL")]
    pub cache_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a configuration with default pool sizes and no cache.
    pub fn new(database_url: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            app_name: app_name.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            cache_url: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Attach a cache URL.
    pub fn with_cache_url(mut self, cache_url: impl Into<String>) -> Self {
        self.cache_url = Some(cache_url.into());
        self
    }

    /// Set both pool size knobs.
    pub fn with_pool_size(mut self, min_connections: u32, max_connections: u32) -> Self {
        self.min_connections = min_connections;
        self.max_connections = max_connections;
        self
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.trim().is_empty() {
            return Err("database_url must not be empty".to_string());
        }
        let url = Url::parse(&self.database_url).map_err(|e| format!("Invalid URL: {e}"))?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(format!(
                "Unsupported database scheme '{}', expected postgres://",
                url.scheme()
            ));
        }
        if self.app_name.trim().is_empty() {
            return Err("app_name must not be empty".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }
        if self.min_connections > self.max_connections {
            return Err(format!(
                "min_connections ({}) cannot exceed max_connections ({})",
                self.min_connections, self.max_connections
            ));
        }
        if let Some(cache_url) = &self.cache_url {
            Url::parse(cache_url).map_err(|e| format!("Invalid cache URL: {e}"))?;
        }
        Ok(())
    }

    /// Database URL with the password masked, safe for logs.
    pub fn redacted_database_url(&self) -> String {
        match Url::parse(&self.database_url) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }

    /// Get the pool acquire timeout as a Duration.
    pub fn acquire_timeout_duration(&self) -> Duration {
        Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS)
    }

    /// Get the pool idle timeout as a Duration.
    pub fn idle_timeout_duration(&self) -> Duration {
        Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)
    }
}

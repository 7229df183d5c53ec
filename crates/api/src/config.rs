//! Application configuration loaded from environment variables.

use std::time::Duration;

use fulfillment::{DEFAULT_CONFLICT_RETRIES, RetryPolicy};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8082`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for JSON log lines, anything else for text
/// - `INVENTORY_URL`: inventory service base URL (default: `"http://localhost:8081"`)
/// - `INVENTORY_TIMEOUT_MS`: per-request timeout (default: `5000`)
/// - `INVENTORY_READ_RETRIES`: extra attempts for product lookups (default: `2`)
/// - `INVENTORY_RETRY_BACKOFF_MS`: first lookup retry delay (default: `100`)
/// - `STOCK_CONFLICT_RETRIES`: release re-reads after a version conflict (default: `3`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset means in-memory storage
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub inventory_url: String,
    pub inventory_timeout: Duration,
    pub inventory_read_retries: u32,
    pub inventory_retry_backoff: Duration,
    pub stock_conflict_retries: u32,
    pub database_url: Option<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            json_logs: std::env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            inventory_url: std::env::var("INVENTORY_URL").unwrap_or(defaults.inventory_url),
            inventory_timeout: Duration::from_millis(env_or("INVENTORY_TIMEOUT_MS", 5_000)),
            inventory_read_retries: env_or("INVENTORY_READ_RETRIES", defaults.inventory_read_retries),
            inventory_retry_backoff: Duration::from_millis(env_or(
                "INVENTORY_RETRY_BACKOFF_MS",
                100,
            )),
            stock_conflict_retries: env_or(
                "STOCK_CONFLICT_RETRIES",
                defaults.stock_conflict_retries,
            ),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Retry policy for product lookups.
    pub fn read_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.inventory_read_retries, self.inventory_retry_backoff)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
            log_level: "info".to_string(),
            json_logs: false,
            inventory_url: "http://localhost:8081".to_string(),
            inventory_timeout: Duration::from_millis(5_000),
            inventory_read_retries: 2,
            inventory_retry_backoff: Duration::from_millis(100),
            stock_conflict_retries: DEFAULT_CONFLICT_RETRIES,
            database_url: None,
        }
    }
}

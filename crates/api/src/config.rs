//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use reputation::ReputationConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `ADMIN_TOKENS`: comma-separated bearer tokens allowed to trigger a full recompute
/// - `RECOMPUTE_PAGE_SIZE`: subjects per page (default: `100`)
/// - `RECOMPUTE_CONCURRENCY`: subjects recomputed at once (default: `8`)
/// - `RECOMPUTE_CALL_TIMEOUT_SECS`: budget per subject (default: `30`)
/// - `FANOUT_BATCH_SIZE`: writes per fan-out batch (default: `500`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub admin_tokens: Vec<String>,
    pub reputation: ReputationConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let reputation = ReputationConfig {
            page_size: positive_or(
                parse_var(&lookup, "RECOMPUTE_PAGE_SIZE"),
                defaults.reputation.page_size,
            ),
            concurrency: positive_or(
                parse_var(&lookup, "RECOMPUTE_CONCURRENCY"),
                defaults.reputation.concurrency,
            ),
            call_timeout: parse_var(&lookup, "RECOMPUTE_CALL_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.reputation.call_timeout),
            fanout_batch_size: positive_or(
                parse_var(&lookup, "FANOUT_BATCH_SIZE"),
                defaults.reputation.fanout_batch_size,
            ),
            ..defaults.reputation
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            admin_tokens: lookup("ADMIN_TOKENS")
                .map(|tokens| split_tokens(&tokens))
                .unwrap_or_default(),
            reputation,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            database_max_connections: 10,
            admin_tokens: Vec::new(),
            reputation: ReputationConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

// Zero is never a usable size.
fn positive_or(value: Option<usize>, default: usize) -> usize {
    value.filter(|v| *v > 0).unwrap_or(default)
}

fn split_tokens(tokens: &str) -> Vec<String> {
    tokens
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

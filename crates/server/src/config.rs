//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 3000)
//! - `BAZAAR_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `BAZAAR_DB_MIN_CONNECTIONS` - Idle connections kept open (default: 1)
//! - `BAZAAR_DB_ACQUIRE_TIMEOUT_SECS` - Wait for a pooled connection (default: 10)
//! - `BAZAAR_STATEMENT_TIMEOUT_MS` - Per-statement timeout (default: 5000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag (default: development)
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance sample rate, 0.0 to 1.0 (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Database pool configuration.
///
/// Implements `Debug` manually to redact the connection URL.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub url: SecretString,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long a request waits for a free connection
    pub acquire_timeout: Duration,
    /// Upper bound for any single statement
    pub statement_timeout: Duration,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct BazaarConfig {
    /// Database pool settings
    pub database: DatabaseConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: String,
    /// Fraction of errors reported to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

impl BazaarConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_lookup(&env)?;
        let host: IpAddr = parse_or_default(&env, "BAZAAR_HOST", "127.0.0.1")?;
        let port: u16 = parse_or_default(&env, "BAZAAR_PORT", "3000")?;

        let sentry_dsn = env("SENTRY_DSN").filter(|dsn| !dsn.trim().is_empty());
        let sentry_environment =
            env("SENTRY_ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let sentry_sample_rate = parse_rate(&env, "SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = parse_rate(&env, "SENTRY_TRACES_SAMPLE_RATE", "0.1")?;

        Ok(Self {
            database,
            host,
            port,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl DatabaseConfig {
    /// Load database settings from environment variables.
    ///
    /// Used directly by the CLI, which needs a pool but no HTTP settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is missing or a numeric setting is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = env("BAZAAR_DATABASE_URL")
            .or_else(|| env("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("BAZAAR_DATABASE_URL".to_string()))?;

        let max_connections: u32 = parse_or_default(env, "BAZAAR_DB_MAX_CONNECTIONS", "10")?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_DB_MAX_CONNECTIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let min_connections: u32 = parse_or_default(env, "BAZAAR_DB_MIN_CONNECTIONS", "1")?;
        let acquire_secs: u64 = parse_or_default(env, "BAZAAR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
        let statement_ms: u64 = parse_or_default(env, "BAZAAR_STATEMENT_TIMEOUT_MS", "5000")?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout: Duration::from_secs(acquire_secs),
            statement_timeout: Duration::from_millis(statement_ms),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable, falling back to `default` when unset.
fn parse_or_default<T>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate and check it lies in `0.0..=1.0`.
fn parse_rate(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<f32, ConfigError> {
    let rate: f32 = parse_or_default(env, key, default)?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            BazaarConfig::from_lookup(lookup(&[("BAZAAR_DATABASE_URL", "postgres://db/bazaar")]))
                .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.acquire_timeout, Duration::from_secs(10));
        assert_eq!(config.database.statement_timeout, Duration::from_millis(5000));
        assert!(config.sentry_dsn.is_none());
        assert_eq!(config.sentry_environment, "development");
    }

    #[test]
    fn test_missing_database_url() {
        let result = BazaarConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_database_url_fallback() {
        let config =
            BazaarConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://fallback/db")]))
                .unwrap();
        assert_eq!(
            config.database.url.expose_secret(),
            "postgres://fallback/db"
        );
    }

    #[test]
    fn test_invalid_port() {
        let result = BazaarConfig::from_lookup(lookup(&[
            ("BAZAAR_DATABASE_URL", "postgres://db/bazaar"),
            ("BAZAAR_PORT", "not-a-port"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "BAZAAR_PORT"));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let result = BazaarConfig::from_lookup(lookup(&[
            ("BAZAAR_DATABASE_URL", "postgres://db/bazaar"),
            ("BAZAAR_DB_MAX_CONNECTIONS", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_sample_rate_out_of_range() {
        let result = BazaarConfig::from_lookup(lookup(&[
            ("BAZAAR_DATABASE_URL", "postgres://db/bazaar"),
            ("SENTRY_TRACES_SAMPLE_RATE", "1.5"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_sentry_dsn_is_disabled() {
        let config = BazaarConfig::from_lookup(lookup(&[
            ("BAZAAR_DATABASE_URL", "postgres://db/bazaar"),
            ("SENTRY_DSN", "  "),
        ]))
        .unwrap();
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_database_config_debug_redacts_url() {
        let config = DatabaseConfig::from_lookup(&lookup(&[(
            "BAZAAR_DATABASE_URL",
            "postgres://user:hunter2@db/bazaar",
        )]))
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }
}

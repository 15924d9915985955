//! CLI subcommands.

use sqlx::PgPool;
use thiserror::Error;

use bazaar_server::config::{ConfigError, DatabaseConfig};
use bazaar_server::db;
use bazaar_server::services::MarketError;

pub mod migrate;
pub mod seed;
pub mod stock;

/// Errors from any CLI command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid catalog file: {0}")]
    Catalog(#[from] serde_yaml::Error),

    /// A marketplace operation was rejected.
    #[error(transparent)]
    Market(#[from] MarketError),
}

/// Connect using the database settings from the environment.
async fn connect() -> Result<PgPool, CommandError> {
    let config = DatabaseConfig::from_env()?;
    tracing::info!(config = ?config, "Connecting to database");
    Ok(db::create_pool(&config).await?)
}

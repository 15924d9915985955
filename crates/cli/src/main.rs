//! Bazaar CLI - Database migrations and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bazaar migrate
//!
//! # Load sellers and products from a YAML catalog
//! bazaar seed catalog.yaml
//!
//! # Show a product and its remaining stock
//! bazaar stock 42
//! ```
//!
//! # Environment Variables
//!
//! - `BAZAAR_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use bazaar_core::ProductId;

mod commands;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar marketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load sellers and products from a YAML catalog in one transaction
    Seed {
        /// Path to the catalog file
        file: PathBuf,
    },
    /// Show a product and its available stock
    Stock {
        /// Product ID
        product_id: ProductId,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
        Commands::Stock { product_id } => commands::stock::show(product_id).await?,
    }
    Ok(())
}

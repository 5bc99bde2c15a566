//! Delivery Board Server
//!
//! A small HTTP service over delivery workflow task records: grouped list and
//! detail views, per-key and per-person daily duration aggregates, slider-row
//! upserts, and admin-gated edits.

use anyhow::Result;
use clap::Parser;
use delivery_board::config::Config;
use delivery_board::db::Database;
use delivery_board::server;
use std::fs::OpenOptions;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Delivery board HTTP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long)]
    database: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut config = Config::load(cli.config.as_deref().map(std::path::Path::new))?;

    // Override paths from CLI arguments
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    config.ensure_db_dir()?;

    info!(
        "Starting Delivery Board Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Database: {:?}", config.server.db_path);
    info!("Allowed origins: {:?}", config.cors.allowed_origins);

    let db = Database::open(&config.server.db_path)?;
    info!("Database initialized successfully");

    server::serve(&config, db).await
}

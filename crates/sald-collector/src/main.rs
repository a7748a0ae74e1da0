//! SALD Collector - one-shot log collection runner

use anyhow::Result;
use clap::Parser;
use sald_collector::{
    config::CollectorConfig, engine::IngestionEngine, geo::GeoResolver, store::PgLogStore,
};
use sald_common::logging::{init_logging, LogConfig, LogLevel};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sald-collector")]
#[command(author, version, about = "Access-log collection runner")]
struct Cli {
    /// Database connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("sald-collector".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    let config = CollectorConfig::from_env()?;
    info!(log_dir = %config.log_dir.display(), "Starting collection pass");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cli.database_url)
        .await?;

    let geo = Arc::new(GeoResolver::from_config(config.geoip_db_path.as_deref()));
    let engine = IngestionEngine::new(config, Arc::new(PgLogStore::new(pool)), geo)?;

    let summary = engine.run().await?;
    info!(
        stored = summary.records_stored,
        files = summary.files_seen,
        failed = summary.files_failed,
        "Collection pass complete"
    );

    Ok(())
}

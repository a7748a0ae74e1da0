//! SALD Server Library
//!
//! HTTP API over the access-log store, plus the periodic scheduler that
//! drives the ingestion engine.
//!
//! # Overview
//!
//! - **API Endpoints**: paginated log queries, per-country summaries, and
//!   the collection trigger/status surface
//! - **Authentication**: a single API key checked on every route except
//!   the health probe
//! - **Scheduler**: interval-driven background collection runs, gated by
//!   the shared run-status flag so at most one run executes at a time
//! - **Database**: PostgreSQL via SQLx; migrations run at startup
//!
//! # Example
//!
//! ```no_run
//! use sald_server::config::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     println!("would bind {}:{}", config.server.host, config.server.port);
//!     Ok(())
//! }
//! ```

use sald_collector::{engine::IngestionEngine, status::StatusHandle};
use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod scheduler;

// Re-export commonly used types
pub use error::{AppError, AppResult};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub engine: Arc<IngestionEngine>,
    pub status: StatusHandle,
    pub api_key: String,
}

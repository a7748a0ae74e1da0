//! SALD Collector Library
//!
//! The log ingestion engine behind the access-log dashboard: it discovers
//! web-server access-log files (the active ones and their rotated gzip
//! archives), tails them incrementally across process restarts, parses each
//! line into a structured record, enriches it with geolocation, and appends
//! only records that are not already in the durable store.
//!
//! Correctness rests on local invariants rather than external coordination:
//! inode identity and monotonic byte offsets for active files, a
//! processed-once flag for immutable archives, a timestamp watermark as a
//! cheap pre-filter, and a `(timestamp, ip, raw line)` dedup key as the
//! exact at-most-once contract.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sald_collector::{
//!     config::CollectorConfig, engine::IngestionEngine, geo::GeoResolver,
//!     store::PgLogStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CollectorConfig::from_env()?;
//!     let pool = sqlx::PgPool::connect("postgresql://localhost/sald").await?;
//!     let geo = Arc::new(GeoResolver::from_config(config.geoip_db_path.as_deref()));
//!     let engine = IngestionEngine::new(config, Arc::new(PgLogStore::new(pool)), geo)?;
//!     let summary = engine.run().await?;
//!     println!("stored {} new records", summary.records_stored);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod geo;
pub mod parser;
pub mod state;
pub mod status;
pub mod store;

pub use engine::{run_collection, IngestionEngine, RunSummary};
pub use status::{CollectionStatus, StatusHandle};

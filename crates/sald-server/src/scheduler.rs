//! Periodic collection scheduler
//!
//! A background task that invokes the ingestion engine at a fixed
//! interval. Each tick goes through the shared status flag, so a tick
//! that arrives while a run is still executing is dropped; the next one
//! simply tries again.

use sald_collector::{run_collection, IngestionEngine, StatusHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::CollectionConfig;

/// Interval-driven collection runner
pub struct CollectionScheduler {
    interval: Duration,
    startup_delay: Duration,
    engine: Arc<IngestionEngine>,
    status: StatusHandle,
}

impl CollectionScheduler {
    pub fn new(
        config: &CollectionConfig,
        engine: Arc<IngestionEngine>,
        status: StatusHandle,
    ) -> Self {
        Self {
            interval: config.interval(),
            startup_delay: config.startup_delay(),
            engine,
            status,
        }
    }

    /// Start the scheduler in the background
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.interval.as_secs(),
                "Collection scheduler started"
            );

            // Initial delay to let the server finish starting.
            sleep(self.startup_delay).await;

            loop {
                if run_collection(&self.engine, &self.status).await.is_none() {
                    debug!("Scheduled tick skipped, a run is already in progress");
                }
                sleep(self.interval).await;
            }
        })
    }
}

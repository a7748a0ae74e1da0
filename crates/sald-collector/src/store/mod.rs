//! Durable store contract
//!
//! The engine consumes the record store through this narrow seam: the
//! current timestamp watermark, the set of dedup keys in a timestamp
//! range, and an all-or-nothing batch append. Everything else about the
//! store (schema, pooling, transactions) stays behind the trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

pub use postgres::PgLogStore;

/// The `(timestamp, ip, raw line)` triple guaranteeing at-most-once storage
pub type DedupKey = (DateTime<Utc>, String, String);

/// One row ready for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
    pub status_code: Option<i32>,
    pub country: String,
    pub request_path: String,
    pub domain: String,
    pub raw_log: String,
}

impl NewLogEntry {
    /// The dedup key of this row
    pub fn dedup_key(&self) -> DedupKey {
        (
            self.timestamp,
            self.ip_address.clone(),
            self.raw_log.clone(),
        )
    }
}

/// Append/query contract the ingestion engine runs against
#[async_trait]
pub trait LogStore: Send + Sync {
    /// The maximum timestamp currently stored, if any
    async fn max_timestamp(&self) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// All dedup keys of stored records with `timestamp >= min_timestamp`
    async fn existing_keys(
        &self,
        min_timestamp: DateTime<Utc>,
    ) -> anyhow::Result<HashSet<DedupKey>>;

    /// Append a batch of rows in a single transaction
    ///
    /// Either every row is stored or none is; returns the number stored.
    async fn append_batch(&self, rows: &[NewLogEntry]) -> anyhow::Result<u64>;
}

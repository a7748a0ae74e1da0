//! Postgres-backed log store
//!
//! Implements the store contract over the `log_entries` table. The dedup
//! key is deliberately not a schema-level uniqueness constraint; the
//! engine enforces it by consulting `existing_keys` before inserting, and
//! the range-bounded query keeps that lookup on the timestamp index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::debug;

use super::{DedupKey, LogStore, NewLogEntry};

/// Store implementation over a Postgres pool
#[derive(Clone)]
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn max_timestamp(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        let max: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(timestamp) FROM log_entries")
                .fetch_one(&self.pool)
                .await?;
        Ok(max)
    }

    async fn existing_keys(
        &self,
        min_timestamp: DateTime<Utc>,
    ) -> anyhow::Result<HashSet<DedupKey>> {
        let rows: Vec<(DateTime<Utc>, String, String)> = sqlx::query_as(
            "SELECT timestamp, ip_address, raw_log FROM log_entries WHERE timestamp >= $1",
        )
        .bind(min_timestamp)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            count = rows.len(),
            min_timestamp = %min_timestamp,
            "Fetched existing dedup keys"
        );
        Ok(rows.into_iter().collect())
    }

    async fn append_batch(&self, rows: &[NewLogEntry]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO log_entries \
                 (ip_address, timestamp, status_code, country, request_path, domain, raw_log) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&row.ip_address)
            .bind(row.timestamp)
            .bind(row.status_code)
            .bind(&row.country)
            .bind(&row.request_path)
            .bind(&row.domain)
            .bind(&row.raw_log)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(rows.len() as u64)
    }
}

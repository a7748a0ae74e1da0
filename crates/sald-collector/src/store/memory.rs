//! In-memory store used by engine tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{DedupKey, LogStore, NewLogEntry};

/// Store keeping appended rows in a mutex-guarded vec
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<NewLogEntry>>,
    fail_appends: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append_batch` fail, simulating an
    /// unreachable store.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<NewLogEntry> {
        self.rows.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Seed a stored row directly, bypassing the engine.
    pub fn insert_directly(&self, row: NewLogEntry) {
        self.rows.lock().unwrap().push(row);
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn max_timestamp(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self.rows.lock().unwrap().iter().map(|r| r.timestamp).max())
    }

    async fn existing_keys(
        &self,
        min_timestamp: DateTime<Utc>,
    ) -> anyhow::Result<HashSet<DedupKey>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.timestamp >= min_timestamp)
            .map(NewLogEntry::dedup_key)
            .collect())
    }

    async fn append_batch(&self, rows: &[NewLogEntry]) -> anyhow::Result<u64> {
        if self.fail_appends.load(Ordering::SeqCst) {
            anyhow::bail!("store unreachable");
        }
        self.rows.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}

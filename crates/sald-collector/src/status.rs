//! Collection run status
//!
//! A single process-wide state machine gates re-entry into the ingestion
//! engine: at most one run executes at a time, and a trigger arriving
//! while a run is in flight is rejected immediately rather than queued.
//! The handle is injected into both the scheduler and the on-demand
//! trigger handler instead of living in ambient global state.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lifecycle of the most recent collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    /// No run active and no unobserved outcome
    Idle,
    /// A run is currently executing
    Running,
    /// The last run completed and its outcome has not been observed yet
    Finished,
    /// The last run failed and its outcome has not been observed yet
    Error,
}

impl std::fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CollectionStatus::Idle => "idle",
            CollectionStatus::Running => "running",
            CollectionStatus::Finished => "finished",
            CollectionStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Shared, thread-safe handle to the collection status
#[derive(Clone)]
pub struct StatusHandle {
    inner: Arc<Mutex<CollectionStatus>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CollectionStatus::Idle)),
        }
    }

    /// Current status
    pub fn get(&self) -> CollectionStatus {
        *self.lock()
    }

    /// Attempt to transition into `Running`
    ///
    /// Returns `false` without changing anything when a run is already in
    /// progress; the check and the transition are a single atomic step.
    pub fn try_begin(&self) -> bool {
        let mut status = self.lock();
        if *status == CollectionStatus::Running {
            return false;
        }
        *status = CollectionStatus::Running;
        true
    }

    /// Mark the active run as completed
    pub fn finish(&self) {
        *self.lock() = CollectionStatus::Finished;
    }

    /// Mark the active run as failed
    pub fn fail(&self) {
        *self.lock() = CollectionStatus::Error;
    }

    /// Return the current status, resetting a terminal outcome to `Idle`
    ///
    /// Used by the status endpoint so that a poller observes `finished` or
    /// `error` exactly once before the flag returns to `idle`.
    pub fn reset_if_terminal(&self) -> CollectionStatus {
        let mut status = self.lock();
        let observed = *status;
        if matches!(
            observed,
            CollectionStatus::Finished | CollectionStatus::Error
        ) {
            *status = CollectionStatus::Idle;
        }
        observed
    }

    fn lock(&self) -> MutexGuard<'_, CollectionStatus> {
        // A poisoned lock only means a holder panicked; the status value
        // itself is always valid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

//! Worker registry
//!
//! The coordinator's authoritative set of currently-trusted workers. Three
//! activities touch it concurrently (discovery, the liveness monitor, and
//! the dispatch loop), so every access goes through one lock. The lock is
//! held only for the duration of the map operation, never across network
//! I/O; anything that might block works from a [`WorkerRegistry::snapshot`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// One discovered worker.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    /// Task-channel endpoint: sender address plus the advertised port.
    pub endpoint: SocketAddr,

    /// Most recent successful discovery reply or completed task.
    pub last_success: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    workers: BTreeMap<u32, WorkerRecord>,
    next_id: u32,
}

/// Mutex-guarded worker set with monotonically assigned ids.
///
/// Ids count up for the life of the run and are never reused after an
/// eviction, so a log line mentioning worker 3 always refers to the same
/// endpoint. At most one record exists per distinct endpoint.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    inner: Mutex<Inner>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `endpoint` if no record for it exists yet.
    ///
    /// Returns the newly assigned id, or `None` when the endpoint is
    /// already registered (the existing record is left untouched).
    pub fn insert_if_absent(&self, endpoint: SocketAddr) -> Option<u32> {
        let mut inner = self.lock();

        if inner.workers.values().any(|w| w.endpoint == endpoint) {
            return None;
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.workers.insert(
            id,
            WorkerRecord {
                endpoint,
                last_success: Instant::now(),
            },
        );

        Some(id)
    }

    /// Refresh a worker's last-success timestamp after a completed task.
    ///
    /// A no-op if the worker has been evicted in the meantime.
    pub fn mark_success(&self, id: u32) {
        if let Some(record) = self.lock().workers.get_mut(&id) {
            record.last_success = Instant::now();
        }
    }

    /// Remove a worker, returning its record if it was present.
    pub fn remove(&self, id: u32) -> Option<WorkerRecord> {
        self.lock().workers.remove(&id)
    }

    /// Copy of the current worker set, in ascending id order.
    pub fn snapshot(&self) -> Vec<(u32, WorkerRecord)> {
        self.lock()
            .workers
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    /// Remove every record that has been silent for longer than `threshold`.
    ///
    /// Returns the evicted entries so the caller can log them.
    pub fn evict_stale(&self, threshold: Duration) -> Vec<(u32, WorkerRecord)> {
        let now = Instant::now();
        let mut inner = self.lock();

        let stale: Vec<u32> = inner
            .workers
            .iter()
            .filter(|(_, record)| now.duration_since(record.last_success) > threshold)
            .map(|(id, _)| *id)
            .collect();

        stale
            .into_iter()
            .filter_map(|id| inner.workers.remove(&id).map(|record| (id, record)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().workers.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock means some registry user panicked mid-operation;
        // the map itself is always left consistent, so keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rewind a worker's last-success time, as if it had been silent for `age`.
    #[cfg(test)]
    fn backdate(&self, id: u32, age: Duration) {
        if let Some(record) = self.lock().workers.get_mut(&id) {
            record.last_success = Instant::now() - age;
        }
    }
}

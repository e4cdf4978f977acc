//! Liveness monitor
//!
//! Recurring background sweep that evicts registry entries silent past the
//! staleness threshold. This is the passive failure-detection path: it
//! reclaims workers that went quiet even when the dispatch loop is not
//! exercising them. An eviction here never interrupts an in-flight task,
//! it only stops a stale entry being selected for a later segment.

use crate::registry::WorkerRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the sweep task.
///
/// The task never finishes on its own; the coordinator aborts the returned
/// handle at teardown.
pub fn spawn(
    registry: Arc<WorkerRegistry>,
    period: Duration,
    threshold: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);

        loop {
            ticker.tick().await;

            for (id, record) in registry.evict_stale(threshold) {
                eprintln!("Worker {} timed out ({}), removed from registry", id, record.endpoint);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn endpoint(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    #[tokio::test]
    async fn test_monitor_evicts_silent_worker() {
        let registry = Arc::new(WorkerRegistry::new());
        registry.insert_if_absent(endpoint(9002));

        let monitor = spawn(
            Arc::clone(&registry),
            Duration::from_millis(20),
            Duration::from_millis(50),
        );

        // Silent past the threshold: a sweep must reclaim the entry.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(registry.is_empty());

        monitor.abort();
    }

    #[tokio::test]
    async fn test_monitor_keeps_fresh_worker() {
        let registry = Arc::new(WorkerRegistry::new());
        let id = registry.insert_if_absent(endpoint(9002)).unwrap();

        let monitor = spawn(
            Arc::clone(&registry),
            Duration::from_millis(20),
            Duration::from_secs(60),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.snapshot()[0].0, id);

        monitor.abort();
    }

    #[tokio::test]
    async fn test_monitor_stops_on_abort() {
        let registry = Arc::new(WorkerRegistry::new());
        let monitor = spawn(
            Arc::clone(&registry),
            Duration::from_millis(10),
            Duration::from_millis(10),
        );

        monitor.abort();
        // An aborted sweep no longer touches the registry.
        registry.insert_if_absent(endpoint(9002));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(registry.len(), 1);
    }
}

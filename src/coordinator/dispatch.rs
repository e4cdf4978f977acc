//! Segment dispatch
//!
//! Strictly sequential: one segment in flight at a time, segments in range
//! order, lowest-id worker first. A failed round-trip evicts the worker and
//! re-offers the same segment to the next entry; the segment is never
//! dropped. This is the active failure-detection path, independent of the
//! liveness monitor's timer.
//!
//! A well-formed 8-byte reply always counts as success, zero included;
//! failure is signaled by the transport alone (connect, send, or receive
//! error).

use crate::protocol;
use crate::registry::{WorkerRecord, WorkerRegistry};
use crate::segment::{segments, Segment};
use anyhow::{Context, Result};
use thiserror::Error;
use tokio::net::TcpStream;

/// Fatal dispatch failures. Transport errors are handled internally by
/// eviction and retry and never surface here.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The registry was empty at entry, or every worker was evicted
    /// mid-run.
    #[error("no workers available to process task")]
    NoWorkersAvailable,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Final accumulated integral value.
    pub total: f64,

    /// Segments folded into the total.
    pub segments_dispatched: usize,

    /// Failed round-trips that triggered an eviction and re-offer.
    pub reassignments: usize,
}

/// Dispatch every segment of `[start, end)` and accumulate the results.
///
/// Fails fast when the registry is empty at entry, and mid-run when the
/// last worker is evicted while a segment still needs an owner. On failure
/// the accumulated value is discarded with the report.
pub async fn run(
    registry: &WorkerRegistry,
    start: f64,
    end: f64,
    step: f64,
    quiet: bool,
) -> Result<DispatchReport, DispatchError> {
    if registry.is_empty() {
        return Err(DispatchError::NoWorkersAvailable);
    }

    let mut report = DispatchReport {
        total: 0.0,
        segments_dispatched: 0,
        reassignments: 0,
    };

    for segment in segments(start, end, step) {
        report.total += dispatch_segment(registry, segment, quiet, &mut report.reassignments).await?;
        report.segments_dispatched += 1;
    }

    Ok(report)
}

/// Offer one segment until some worker completes it.
async fn dispatch_segment(
    registry: &WorkerRegistry,
    segment: Segment,
    quiet: bool,
    reassignments: &mut usize,
) -> Result<f64, DispatchError> {
    loop {
        // Work from a snapshot: the lock is never held across network I/O.
        let (id, worker) = match registry.snapshot().into_iter().next() {
            Some(entry) => entry,
            None => return Err(DispatchError::NoWorkersAvailable),
        };

        match send_task(&worker, segment).await {
            Ok(value) => {
                registry.mark_success(id);

                if !quiet {
                    println!(
                        "  Segment [{}, {}) -> {} (worker {})",
                        segment.start, segment.end, value, id
                    );
                }

                return Ok(value);
            }
            Err(e) => {
                // Active eviction: the worker that failed the segment is
                // removed immediately, and the same segment is re-offered.
                eprintln!(
                    "Warning: worker {} failed segment [{}, {}): {:#}",
                    id, segment.start, segment.end, e
                );
                registry.remove(id);
                *reassignments += 1;
            }
        }
    }
}

/// One blocking round-trip: connect, send the triple, await the value.
///
/// There is no timeout on the reply. A connected but unresponsive worker
/// stalls the dispatch loop until the peer closes the connection.
async fn send_task(worker: &WorkerRecord, segment: Segment) -> Result<f64> {
    let mut stream = TcpStream::connect(worker.endpoint)
        .await
        .with_context(|| format!("Failed to connect to {}", worker.endpoint))?;

    protocol::write_task(&mut stream, segment.start, segment.end, segment.step).await?;
    protocol::read_result(&mut stream).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::compute;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// Worker that serves every connection with the reference integrand.
    async fn spawn_square_worker() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let (start, end, step) = protocol::read_task(&mut stream).await.unwrap();
                let result = compute::integrate(compute::square, start, end, step);
                protocol::write_result(&mut stream, result).await.unwrap();
            }
        });

        addr
    }

    /// Worker that accepts connections but never replies: every task sent
    /// to it fails with a transport error when it drops the connection.
    async fn spawn_failing_worker() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let _ = protocol::read_task(&mut stream).await;
                drop(stream);
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_single_worker_whole_range() {
        let registry = WorkerRegistry::new();
        registry.insert_if_absent(spawn_square_worker().await);

        let report = run(&registry, 0.0, 2.0, 1.0, true).await.unwrap();

        // f(0)·1 for [0,1) plus f(1)·1 for [1,2).
        assert_eq!(report.total, 1.0);
        assert_eq!(report.segments_dispatched, 2);
        assert_eq!(report.reassignments, 0);
    }

    #[tokio::test]
    async fn test_zero_result_is_a_legitimate_answer() {
        let registry = WorkerRegistry::new();
        let id = registry.insert_if_absent(spawn_square_worker().await).unwrap();

        // The single segment [0,1) computes exactly 0.0; the worker must
        // stay registered and the run must succeed.
        let report = run(&registry, 0.0, 1.0, 1.0, true).await.unwrap();

        assert_eq!(report.total, 0.0);
        assert_eq!(report.reassignments, 0);
        assert_eq!(registry.snapshot()[0].0, id);
    }

    #[tokio::test]
    async fn test_failing_worker_evicted_and_segment_reassigned() {
        let registry = WorkerRegistry::new();
        // Lower id: the failing worker is selected first.
        let failing = registry.insert_if_absent(spawn_failing_worker().await).unwrap();
        let healthy = registry.insert_if_absent(spawn_square_worker().await).unwrap();

        let report = run(&registry, 0.0, 2.0, 1.0, true).await.unwrap();

        // The total equals what the healthy worker alone produces; the
        // reassigned segment is folded in exactly once.
        assert_eq!(report.total, 1.0);
        assert_eq!(report.segments_dispatched, 2);
        assert_eq!(report.reassignments, 1);

        let ids: Vec<u32> = registry.snapshot().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![healthy]);
        assert!(registry.snapshot().iter().all(|(id, _)| *id != failing));
    }

    #[tokio::test]
    async fn test_empty_registry_fails_immediately() {
        let registry = WorkerRegistry::new();

        let err = run(&registry, 0.0, 2.0, 1.0, true).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoWorkersAvailable));
    }

    #[tokio::test]
    async fn test_registry_exhaustion_mid_run_is_fatal() {
        let registry = WorkerRegistry::new();
        registry.insert_if_absent(spawn_failing_worker().await);

        let err = run(&registry, 0.0, 2.0, 1.0, true).await.unwrap_err();

        assert!(matches!(err, DispatchError::NoWorkersAvailable));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_worker_counts_as_transport_failure() {
        let registry = WorkerRegistry::new();

        // Reserve an address, then free it so the connect is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = listener.local_addr().unwrap();
        drop(listener);

        registry.insert_if_absent(dead_addr);
        registry.insert_if_absent(spawn_square_worker().await);

        let report = run(&registry, 1.0, 2.0, 1.0, true).await.unwrap();

        assert_eq!(report.total, 1.0);
        assert_eq!(report.reassignments, 1);
        assert_eq!(registry.len(), 1);
    }
}

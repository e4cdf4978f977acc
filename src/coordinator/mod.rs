//! Coordinator
//!
//! Orchestrates a run: the liveness monitor starts first and prunes the
//! registry in the background, discovery populates the registry once at
//! startup, then the dispatch loop consumes it segment by segment until the
//! range is exhausted or the registry is empty.

pub mod discovery;
pub mod dispatch;
pub mod monitor;

use crate::config::CoordinatorConfig;
use crate::output::RunSummary;
use crate::registry::WorkerRegistry;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;

pub use dispatch::{DispatchError, DispatchReport};

/// Coordinator
///
/// Owns the registry and drives discovery, monitoring, and dispatch.
pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    /// Run one complete integration and return its summary.
    pub async fn run(self) -> Result<RunSummary> {
        let cfg = &self.config;
        let registry = Arc::new(WorkerRegistry::new());
        let started = Instant::now();

        // Passive failure detection runs for the whole life of the run,
        // starting before discovery like the rest of the registry's users.
        let monitor = monitor::spawn(
            Arc::clone(&registry),
            cfg.monitor_period(),
            cfg.staleness_timeout(),
        );

        let discovered = discovery::discover(
            &registry,
            cfg.probe_addr(),
            cfg.discovery_window(),
            cfg.quiet,
        )
        .await;

        let discovered = match discovered {
            Ok(count) => count,
            Err(e) => {
                monitor.abort();
                return Err(e);
            }
        };

        if discovered == 0 {
            monitor.abort();
            anyhow::bail!("No workers discovered. Exiting.");
        }

        if !cfg.quiet {
            println!("Discovered {} workers", discovered);
            println!();
            println!("Dispatching segments...");
        }

        let result = dispatch::run(
            &registry,
            cfg.range_start,
            cfg.range_end,
            cfg.segment_width,
            cfg.quiet,
        )
        .await;

        // The monitor has no shutdown path of its own; abort it once
        // dispatch settles, before reporting either way.
        monitor.abort();

        let report = result.context("Dispatch failed")?;

        Ok(RunSummary {
            range_start: cfg.range_start,
            range_end: cfg.range_end,
            segment_width: cfg.segment_width,
            workers_discovered: discovered,
            segments_dispatched: report.segments_dispatched,
            reassignments: report.reassignments,
            elapsed_secs: started.elapsed().as_secs_f64(),
            total: report.total,
        })
    }
}

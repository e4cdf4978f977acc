//! Run reporting
//!
//! Text summary printed at the end of a coordinator run, plus an optional
//! JSON rendering of the same numbers for downstream tooling.

pub mod json;

use serde::{Deserialize, Serialize};

/// Everything a finished run reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub range_start: f64,
    pub range_end: f64,
    pub segment_width: f64,
    pub workers_discovered: usize,
    pub segments_dispatched: usize,
    pub reassignments: usize,
    pub elapsed_secs: f64,
    pub total: f64,
}

/// Print the closing summary block.
pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("═══════════════════════════════════════════════════════════");
    println!("                    RUN SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!(
        "Range:     [{}, {}) step {}",
        summary.range_start, summary.range_end, summary.segment_width
    );
    println!("Workers:   {} discovered", summary.workers_discovered);
    println!(
        "Segments:  {} dispatched, {} reassigned",
        summary.segments_dispatched, summary.reassignments
    );
    println!("Elapsed:   {:.3}s", summary.elapsed_secs);
    println!();
    println!("Final integral result: {}", summary.total);
}

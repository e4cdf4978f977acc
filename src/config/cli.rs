//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Coordinator mode (default) - discover workers and dispatch segments
    Coordinator,
    /// Worker mode - answer discovery probes and compute segments
    Worker,
}

/// Quadnet - distributed numerical integration
#[derive(Parser, Debug)]
#[command(name = "quadnet")]
#[command(version, about, long_about = None)]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Execution mode: coordinator or worker
    #[arg(long, value_enum, default_value = "coordinator")]
    pub mode: ExecutionMode,

    /// Integration range start (coordinator mode)
    #[arg(value_name = "START")]
    pub range_start: Option<f64>,

    /// Integration range end (coordinator mode)
    #[arg(value_name = "END")]
    pub range_end: Option<f64>,

    /// Segment width, also used by workers as the sampling step (coordinator mode)
    #[arg(value_name = "STEP")]
    pub segment_width: Option<f64>,

    /// TOML configuration file (CLI flags override file values)
    #[arg(long)]
    pub config: Option<PathBuf>,

    // === Network Options ===
    /// UDP port shared by every participant for discovery
    #[arg(long)]
    pub discovery_port: Option<u16>,

    /// Discovery reply window in seconds
    #[arg(long)]
    pub discovery_timeout: Option<u64>,

    /// Seconds of silence before a worker is evicted from the registry
    #[arg(long)]
    pub staleness_timeout: Option<u64>,

    /// Lowest task port a worker may choose
    #[arg(long)]
    pub task_port_min: Option<u16>,

    /// Highest task port a worker may choose
    #[arg(long)]
    pub task_port_max: Option<u16>,

    // === Output Options ===
    /// Write the run summary as JSON to this path (coordinator mode)
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Suppress progress output (the final result still prints)
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

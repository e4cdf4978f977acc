//! Quadnet CLI entry point

use anyhow::{Context, Result};
use quadnet::config::{self, cli::{Cli, ExecutionMode}};
use quadnet::coordinator::Coordinator;
use quadnet::output;
use quadnet::worker::WorkerService;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    if !cli.quiet {
        println!("Quadnet v{}", env!("CARGO_PKG_VERSION"));
        println!("Distributed numerical integration");
        println!();
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    match cli.mode {
        ExecutionMode::Coordinator => run_coordinator(&runtime, cli),
        ExecutionMode::Worker => run_worker(&runtime, cli),
    }
}

/// Run a coordinator: discover workers, dispatch the range, report.
fn run_coordinator(runtime: &tokio::runtime::Runtime, cli: Cli) -> Result<()> {
    let config = config::coordinator_config(&cli)?;
    let json_output = config.json_output.clone();
    let quiet = config.quiet;

    let summary = runtime.block_on(Coordinator::new(config).run())?;

    if quiet {
        println!("Final integral result: {}", summary.total);
    } else {
        output::print_summary(&summary);
    }

    if let Some(path) = json_output {
        output::json::write_summary(&summary, &path)?;
        if !quiet {
            println!("JSON summary written to: {}", path.display());
        }
    }

    Ok(())
}

/// Run a worker: answer probes and serve tasks until the process is killed.
fn run_worker(runtime: &tokio::runtime::Runtime, cli: Cli) -> Result<()> {
    let config = config::worker_config(&cli)?;

    runtime.block_on(WorkerService::new(config).run())
}

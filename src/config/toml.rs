//! TOML configuration file parsing

use super::cli::Cli;
use super::FileConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<FileConfig> {
    let config: FileConfig =
        ::toml::from_str(contents).context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments over the file configuration (CLI takes precedence)
pub fn merge_cli(config: &mut FileConfig, cli: &Cli) {
    if let Some(port) = cli.discovery_port {
        config.network.discovery_port = port;
    }
    if let Some(min) = cli.task_port_min {
        config.network.task_port_min = min;
    }
    if let Some(max) = cli.task_port_max {
        config.network.task_port_max = max;
    }
    if let Some(secs) = cli.discovery_timeout {
        config.limits.discovery_timeout_secs = secs;
    }
    if let Some(secs) = cli.staleness_timeout {
        config.limits.staleness_timeout_secs = secs;
    }
}

//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! File values fill in whatever the CLI leaves unset; the CLI always wins.

pub mod cli;
pub mod toml;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Network settings shared by both execution modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// UDP port shared by every participant for discovery
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,

    /// Address the coordinator sends the probe to
    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: IpAddr,

    /// Lowest task port a worker may draw
    #[serde(default = "default_task_port_min")]
    pub task_port_min: u16,

    /// Highest task port a worker may draw
    #[serde(default = "default_task_port_max")]
    pub task_port_max: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            discovery_port: default_discovery_port(),
            broadcast_addr: default_broadcast_addr(),
            task_port_min: default_task_port_min(),
            task_port_max: default_task_port_max(),
        }
    }
}

/// Timing limits for discovery and liveness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Discovery reply window, in seconds
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,

    /// Seconds of silence before the monitor evicts a worker
    #[serde(default = "default_staleness_timeout")]
    pub staleness_timeout_secs: u64,

    /// Liveness monitor sweep period, in seconds
    #[serde(default = "default_monitor_period")]
    pub monitor_period_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_secs: default_discovery_timeout(),
            staleness_timeout_secs: default_staleness_timeout(),
            monitor_period_secs: default_monitor_period(),
        }
    }
}

/// Shape of the TOML configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

fn default_discovery_port() -> u16 {
    9001
}

fn default_broadcast_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::BROADCAST)
}

fn default_task_port_min() -> u16 {
    9002
}

fn default_task_port_max() -> u16 {
    9008
}

fn default_discovery_timeout() -> u64 {
    10
}

fn default_staleness_timeout() -> u64 {
    10
}

fn default_monitor_period() -> u64 {
    1
}

/// Resolved coordinator settings.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub range_start: f64,
    pub range_end: f64,
    pub segment_width: f64,
    pub network: NetworkConfig,
    pub limits: LimitsConfig,
    pub json_output: Option<PathBuf>,
    pub quiet: bool,
}

impl CoordinatorConfig {
    /// Destination of the discovery probe.
    pub fn probe_addr(&self) -> SocketAddr {
        SocketAddr::new(self.network.broadcast_addr, self.network.discovery_port)
    }

    pub fn discovery_window(&self) -> Duration {
        Duration::from_secs(self.limits.discovery_timeout_secs)
    }

    pub fn staleness_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.staleness_timeout_secs)
    }

    pub fn monitor_period(&self) -> Duration {
        Duration::from_secs(self.limits.monitor_period_secs)
    }
}

/// Resolved worker settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub network: NetworkConfig,
    pub quiet: bool,
}

/// Build the resolved coordinator configuration from CLI and file.
pub fn coordinator_config(cli: &cli::Cli) -> Result<CoordinatorConfig> {
    let file = load_file_config(cli)?;

    let range_start = cli
        .range_start
        .context("Missing START argument (usage: quadnet <START> <END> <STEP>)")?;
    let range_end = cli
        .range_end
        .context("Missing END argument (usage: quadnet <START> <END> <STEP>)")?;
    let segment_width = cli
        .segment_width
        .context("Missing STEP argument (usage: quadnet <START> <END> <STEP>)")?;

    validate_range(range_start, range_end, segment_width)?;

    Ok(CoordinatorConfig {
        range_start,
        range_end,
        segment_width,
        network: file.network,
        limits: file.limits,
        json_output: cli.json_output.clone(),
        quiet: cli.quiet,
    })
}

/// Build the resolved worker configuration from CLI and file.
pub fn worker_config(cli: &cli::Cli) -> Result<WorkerConfig> {
    let file = load_file_config(cli)?;

    if file.network.task_port_min > file.network.task_port_max {
        anyhow::bail!(
            "Task port range is empty: {} > {}",
            file.network.task_port_min,
            file.network.task_port_max
        );
    }

    Ok(WorkerConfig {
        network: file.network,
        quiet: cli.quiet,
    })
}

fn load_file_config(cli: &cli::Cli) -> Result<FileConfig> {
    let mut file = match &cli.config {
        Some(path) => toml::parse_toml_file(path)?,
        None => FileConfig::default(),
    };

    toml::merge_cli(&mut file, cli);

    Ok(file)
}

/// Validate the integration range arguments.
pub fn validate_range(start: f64, end: f64, step: f64) -> Result<()> {
    if !start.is_finite() || !end.is_finite() || !step.is_finite() {
        anyhow::bail!("Range arguments must be finite numbers");
    }

    if start >= end {
        anyhow::bail!(
            "Range start ({}) must be less than range end ({})",
            start,
            end
        );
    }

    if step <= 0.0 {
        anyhow::bail!("Segment width must be positive, got {}", step);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileConfig::default();

        assert_eq!(config.network.discovery_port, 9001);
        assert_eq!(config.network.task_port_min, 9002);
        assert_eq!(config.network.task_port_max, 9008);
        assert_eq!(config.limits.discovery_timeout_secs, 10);
        assert_eq!(config.limits.staleness_timeout_secs, 10);
        assert_eq!(config.limits.monitor_period_secs, 1);
    }

    #[test]
    fn test_validate_range_accepts_well_formed() {
        assert!(validate_range(0.0, 2.0, 1.0).is_ok());
        assert!(validate_range(-5.0, 5.0, 0.1).is_ok());
    }

    #[test]
    fn test_validate_range_rejects_inverted() {
        assert!(validate_range(2.0, 0.0, 1.0).is_err());
        assert!(validate_range(2.0, 2.0, 1.0).is_err());
    }

    #[test]
    fn test_validate_range_rejects_bad_step() {
        assert!(validate_range(0.0, 2.0, 0.0).is_err());
        assert!(validate_range(0.0, 2.0, -1.0).is_err());
    }

    #[test]
    fn test_validate_range_rejects_non_finite() {
        assert!(validate_range(f64::NAN, 2.0, 1.0).is_err());
        assert!(validate_range(0.0, f64::INFINITY, 1.0).is_err());
        assert!(validate_range(0.0, 2.0, f64::NAN).is_err());
    }

    #[test]
    fn test_probe_addr_combines_network_settings() {
        let config = CoordinatorConfig {
            range_start: 0.0,
            range_end: 1.0,
            segment_width: 1.0,
            network: NetworkConfig::default(),
            limits: LimitsConfig::default(),
            json_output: None,
            quiet: false,
        };

        assert_eq!(config.probe_addr().to_string(), "255.255.255.255:9001");
    }
}

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::registry::MilestoneKind;

/// Root configuration
///
/// Every section carries declared defaults, so an empty file yields a
/// complete, valid configuration. Composite sections populate
/// recursively through their own `Default` impls.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub lifetime: LifetimeConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Watchdog thresholds, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifetimeConfig {
    /// Max time since a running milestone's last update before its worker
    /// is terminated.
    #[serde(default = "default_max_dwell")]
    pub max_update_dwell_secs: u64,
    /// Max total wall time for a running milestone, regardless of
    /// heartbeats.
    #[serde(default = "default_max_run")]
    pub max_run_secs: u64,
    /// How often the watchdog polls the registry.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self {
            max_update_dwell_secs: default_max_dwell(),
            max_run_secs: default_max_run(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_max_dwell() -> u64 {
    300 // 5 minutes without a heartbeat
}

fn default_max_run() -> u64 {
    3600 // 1 hour wall time per milestone
}

fn default_poll_interval() -> u64 {
    5
}

/// Call dispatcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatcherConfig {
    /// Bounded depth of the call queue.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_queue_depth() -> usize {
    256
}

/// Final report output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Where the pipeline report JSON is written. The previous run's file
    /// at the same path is served back to workers as context.
    #[serde(default = "default_report_path")]
    pub path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
        }
    }
}

fn default_report_path() -> PathBuf {
    PathBuf::from("pipeline-report.json")
}

/// Worker process commands, one optional entry per milestone kind.
///
/// A milestone without a command is not spawned by the orchestrator and
/// is expected to be driven externally, if at all.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkersConfig {
    #[serde(default)]
    pub initial_setup: Option<WorkerCommand>,
    #[serde(default)]
    pub content_sync: Option<WorkerCommand>,
    #[serde(default)]
    pub run_report: Option<WorkerCommand>,
}

impl WorkersConfig {
    pub fn command_for(&self, kind: MilestoneKind) -> Option<&WorkerCommand> {
        match kind {
            MilestoneKind::InitialSetup => self.initial_setup.as_ref(),
            MilestoneKind::ContentSync => self.content_sync.as_ref(),
            MilestoneKind::RunReport => self.run_report.as_ref(),
        }
    }
}

/// One worker's launch command.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

pub mod catalog;
pub mod report;
pub mod scan;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gvmkit_common::config::{Config, Overrides};
use gvmkit_common::entities::{EntityId, HostSpec, PortRange};
use gvmkit_core::{ProtocolAdapter, ReportService, ScanOrchestrator, UnixSessionChannel, channel};

#[derive(Parser)]
#[command(name = "gvmkit")]
#[command(about = "Drive a Greenbone manager: targets, scans, reports and deltas.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log filter, e.g. "debug" or "gvmkit_core=trace" [env: LOG_LEVEL]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// gvmd Unix socket [env: GMP_SOCKET]
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    /// GMP user [env: GMP_USERNAME]
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// GMP password [env: GMP_PASSWORD]
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Per-request timeout in seconds [env: GMP_TIMEOUT_SECS]
    // not global: `watch --timeout` bounds the whole watch instead
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the manager's GMP version
    #[command(alias = "v")]
    Version,
    /// List scan targets
    Targets,
    /// Show one target
    Target { id: EntityId },
    /// List scan tasks
    Tasks,
    /// Show one task
    Task { id: EntityId },
    /// List port lists
    PortLists,
    /// List scan configurations
    Configs,
    /// List scanners
    Scanners,
    /// Create or reuse a target and task for the hosts, then start scanning
    #[command(alias = "s")]
    Scan {
        /// Comma-separated hosts, ranges or CIDR blocks
        hosts: HostSpec,
        /// Port list id [default: GMP_PORT_LIST]
        #[arg(long)]
        port_list: Option<EntityId>,
        /// Inline ports instead of a port list, e.g. "T:1-1024,U:53"
        #[arg(long, conflicts_with = "port_list")]
        port_range: Option<PortRange>,
        /// Name for the target instead of one derived from hosts and ports
        #[arg(long, value_parser = non_empty)]
        name: Option<String>,
        /// Scan config id [default: GMP_SCAN_CONFIG]
        #[arg(long)]
        config: Option<EntityId>,
    },
    /// Read a task's status once
    Status { task: EntityId },
    /// Poll a task's status until it finishes
    #[command(alias = "w")]
    Watch {
        task: EntityId,
        /// Seconds between status reads
        #[arg(long, default_value_t = 10)]
        interval: u64,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Give up after this many status reads
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Start a task that is not running
    Start { task: EntityId },
    /// Stop a requested or running task
    Stop { task: EntityId },
    /// Start a finished task again
    Rescan {
        #[arg(required_unless_present = "target", conflicts_with = "target")]
        task: Option<EntityId>,
        /// Rescan the task that scans this target
        #[arg(long)]
        target: Option<EntityId>,
    },
    /// Show the latest completed report of a task, or one report by id
    #[command(alias = "r")]
    Report {
        #[arg(required_unless_present = "id", conflicts_with = "id")]
        task: Option<EntityId>,
        /// Report id
        #[arg(long)]
        id: Option<EntityId>,
    },
    /// Compare two reports, or the two newest reports of a task
    #[command(alias = "d")]
    Delta {
        #[arg(requires = "newer", required_unless_present = "task")]
        older: Option<EntityId>,
        #[arg(conflicts_with = "task")]
        newer: Option<EntityId>,
        /// Compare the two newest completed reports of this task
        #[arg(long, conflicts_with = "older")]
        task: Option<EntityId>,
    },
}

fn non_empty(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err("must not be empty".into())
    } else {
        Ok(trimmed.to_string())
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl GlobalArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            username: self.username.clone(),
            password: self.password.clone(),
            socket_path: self.socket.clone(),
            timeout_secs: self.timeout,
            log_level: self.log_level.clone(),
        }
    }
}

/// Core services wired to one manager session.
pub struct Session {
    pub config: Config,
    pub orchestrator: ScanOrchestrator,
    pub reports: ReportService,
    pub json: bool,
}

impl Session {
    pub fn connect(config: Config, json: bool) -> Self {
        let channel = channel::shared(UnixSessionChannel::from_config(&config));
        let adapter = ProtocolAdapter::new(channel);
        Self {
            orchestrator: ScanOrchestrator::new(adapter.clone(), config.scan.scanner.clone()),
            reports: ReportService::new(adapter, config.report.clone()),
            config,
            json,
        }
    }
}

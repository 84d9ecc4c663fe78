use std::time::{Duration, Instant};

use colored::*;
use gvmkit_common::entities::{
    EntityId, HostSpec, PortRange, PortSelection, TargetRequest, TaskStatus,
};
use gvmkit_core::{PollPolicy, StatusWatcher, WatchEnd, WatchOutcome};
use tracing::{Instrument, info};

use crate::commands::Session;
use crate::terminal::{colors, format, print, spinner};

pub struct WatchArgs {
    pub interval: u64,
    pub timeout: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl WatchArgs {
    fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.interval.max(1)),
            max_attempts: self.max_attempts,
            timeout: self.timeout.map(Duration::from_secs),
            ..PollPolicy::default()
        }
    }
}

pub struct TargetArgs {
    pub hosts: HostSpec,
    pub port_list: Option<EntityId>,
    pub port_range: Option<PortRange>,
    pub name: Option<String>,
}

impl TargetArgs {
    fn request(self, session: &Session) -> TargetRequest {
        let ports = match (self.port_range, self.port_list) {
            (Some(range), _) => PortSelection::Range(range),
            (None, Some(port_list)) => PortSelection::List(port_list),
            (None, None) => PortSelection::List(session.config.scan.port_list.clone()),
        };
        let request = TargetRequest::new(self.hosts, ports);
        match self.name {
            Some(name) => request.named(name),
            None => request,
        }
    }
}

pub async fn scan(
    session: &Session,
    target: TargetArgs,
    config: Option<EntityId>,
) -> anyhow::Result<()> {
    let config = config.unwrap_or_else(|| session.config.scan.scan_config.clone());
    let request = target.request(session);

    info!(hosts = %request.hosts, ports = %request.ports, config = %config, "starting scan");
    let task_id = session.orchestrator.start_scan_for(&request, &config).await?;

    if session.json {
        return print::json(&serde_json::json!({
            "task_id": task_id,
            "target_name": request.target_name(),
            "hosts": request.hosts,
            "ports": request.ports,
        }));
    }
    print::header("scan requested");
    print::align_keys(["Target", "Hosts", "Ports", "Config", "Task"]);
    print::aligned_line("Target", request.target_name());
    print::aligned_line("Hosts", request.hosts.to_string());
    print::aligned_line("Ports", request.ports.to_string());
    print::aligned_line("Config", config.to_string());
    print::aligned_line("Task", task_id.to_string().color(colors::IDENTIFIER));
    print::fat_separator();
    print::centerln(&format!("gvmkit watch {task_id}"), |s| s.bold().green());
    Ok(())
}

pub async fn status(session: &Session, task: &EntityId) -> anyhow::Result<()> {
    let status = session.orchestrator.poll_status(task).await?;
    show_status(session, "task status", &status)
}

pub async fn start(session: &Session, task: &EntityId) -> anyhow::Result<()> {
    let status = session.orchestrator.start_task(task).await?;
    show_status(session, "scan requested", &status)
}

pub async fn stop(session: &Session, task: &EntityId) -> anyhow::Result<()> {
    let status = session.orchestrator.stop_scan(task).await?;
    show_status(session, "scan stopped", &status)
}

pub async fn rescan(
    session: &Session,
    task: Option<EntityId>,
    target: Option<EntityId>,
) -> anyhow::Result<()> {
    let status = match (task, target) {
        (Some(task), _) => session.orchestrator.rescan(&task).await?,
        (None, Some(target)) => session.orchestrator.rescan_target(&target).await?,
        (None, None) => anyhow::bail!("rescan needs a task id or --target"),
    };
    show_status(session, "rescan requested", &status)
}

pub async fn watch(session: &Session, task: &EntityId, args: WatchArgs) -> anyhow::Result<()> {
    let span = spinner::watch_span(task.as_str());
    let watcher = StatusWatcher::new(&session.orchestrator, args.policy());

    let started = Instant::now();
    let outcome = watcher
        .watch(task, |status| spinner::report_status(&span, status))
        .instrument(span.clone())
        .await?;
    drop(span);

    if session.json {
        return print::json(&outcome);
    }
    watch_ends(&outcome, started.elapsed());
    Ok(())
}

fn watch_ends(outcome: &WatchOutcome, total_time: Duration) {
    print::header("watch finished");
    print::align_keys(["Task", "State", "Attempts", "Ended"]);
    print::aligned_line("Task", outcome.status.task_id.to_string().color(colors::IDENTIFIER));
    print::aligned_line("State", format::state(&outcome.status.state));
    print::aligned_line("Attempts", outcome.attempts.to_string());
    let ended = match outcome.end {
        WatchEnd::Terminal => "task finished".green(),
        WatchEnd::AttemptsExhausted => "attempt limit reached".yellow(),
        WatchEnd::TimedOut => "timed out".yellow(),
    };
    print::aligned_line("Ended", ended);

    print::fat_separator();
    print::centerln(
        &format!("Watched for {:.2}s", total_time.as_secs_f64()),
        |s| s.bold().yellow(),
    );
}

fn show_status(session: &Session, title: &str, status: &TaskStatus) -> anyhow::Result<()> {
    if session.json {
        return print::json(status);
    }
    print::header(title);
    print::align_keys(["Task", "State"]);
    print::aligned_line("Task", status.task_id.to_string().color(colors::IDENTIFIER));
    print::aligned_line("State", format::state(&status.state));
    Ok(())
}

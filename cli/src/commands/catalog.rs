use colored::*;
use gvmkit_common::entities::{EntityId, PortList, ScanConfig, Scanner, Target, Task};

use crate::commands::Session;
use crate::gprint;
use crate::terminal::{colors, format, print};

type Detail = (String, ColoredString);

pub async fn version(session: &Session) -> anyhow::Result<()> {
    let version = session.orchestrator.get_version().await?;
    if session.json {
        return print::json(&serde_json::json!({ "version": version }));
    }
    print::header("manager");
    print::align_keys(["Socket", "GMP version"]);
    print::aligned_line("Socket", session.config.socket_path.display().to_string());
    print::aligned_line("GMP version", version.bold().green());
    Ok(())
}

pub async fn targets(session: &Session) -> anyhow::Result<()> {
    let targets = session.orchestrator.list_targets().await?;
    if session.json {
        return print::json(&targets);
    }
    list("targets", &targets, |t| t.name.as_str(), target_details);
    Ok(())
}

pub async fn target(session: &Session, id: &EntityId) -> anyhow::Result<()> {
    let target = session.orchestrator.get_target(id).await?;
    if session.json {
        return print::json(&target);
    }
    print::header("target");
    print::tree_head(0, &target.name);
    print::as_tree_one_level(target_details(&target));
    Ok(())
}

pub async fn tasks(session: &Session) -> anyhow::Result<()> {
    let tasks = session.orchestrator.list_tasks().await?;
    if session.json {
        return print::json(&tasks);
    }
    list("tasks", &tasks, |t| t.name.as_str(), task_details);
    Ok(())
}

pub async fn task(session: &Session, id: &EntityId) -> anyhow::Result<()> {
    let task = session.orchestrator.get_task(id).await?;
    if session.json {
        return print::json(&task);
    }
    print::header("task");
    print::tree_head(0, &task.name);
    print::as_tree_one_level(task_details(&task));
    Ok(())
}

pub async fn port_lists(session: &Session) -> anyhow::Result<()> {
    let port_lists = session.orchestrator.list_port_lists().await?;
    if session.json {
        return print::json(&port_lists);
    }
    list("port lists", &port_lists, |p| p.name.as_str(), port_list_details);
    Ok(())
}

pub async fn scan_configs(session: &Session) -> anyhow::Result<()> {
    let configs = session.orchestrator.list_scan_configs().await?;
    if session.json {
        return print::json(&configs);
    }
    list("scan configs", &configs, |c| c.name.as_str(), scan_config_details);
    Ok(())
}

pub async fn scanners(session: &Session) -> anyhow::Result<()> {
    let scanners = session.orchestrator.list_scanners().await?;
    if session.json {
        return print::json(&scanners);
    }
    list("scanners", &scanners, |s| s.name.as_str(), scanner_details);
    Ok(())
}

fn list<T>(what: &str, items: &[T], name: impl Fn(&T) -> &str, details: impl Fn(&T) -> Vec<Detail>) {
    if items.is_empty() {
        print::no_results(what);
        return;
    }
    print::header(what);
    for (idx, item) in items.iter().enumerate() {
        print::tree_head(idx, name(item));
        print::as_tree_one_level(details(item));
        if idx + 1 != items.len() {
            gprint!();
        }
    }
    print::fat_separator();
    print::centerln(&format!("{} {what}", items.len()), |s| s.bold().green());
}

fn id(id: &EntityId) -> Detail {
    ("ID".to_string(), id.to_string().color(colors::IDENTIFIER))
}

fn target_details(target: &Target) -> Vec<Detail> {
    let mut details = vec![
        id(&target.id),
        ("Hosts".to_string(), target.hosts.to_string().normal()),
        ("Port list".to_string(), format::entity_ref(&target.port_list)),
    ];
    if let Some(comment) = &target.comment {
        details.push(("Comment".to_string(), comment.as_str().italic()));
    }
    details
}

fn task_details(task: &Task) -> Vec<Detail> {
    let mut details = vec![
        id(&task.id),
        ("State".to_string(), format::state(&task.state)),
        ("Target".to_string(), format::entity_ref(&task.target)),
        ("Config".to_string(), format::entity_ref(&task.config)),
    ];
    if let Some(scanner) = &task.scanner {
        details.push(("Scanner".to_string(), format::entity_ref(scanner)));
    }
    details.push(("Reports".to_string(), task.finished_reports.to_string().normal()));
    if let Some(report) = &task.last_report {
        details.push(("Last report".to_string(), report.to_string().color(colors::IDENTIFIER)));
    }
    details
}

fn port_list_details(port_list: &PortList) -> Vec<Detail> {
    let count = &port_list.port_count;
    vec![
        id(&port_list.id),
        (
            "Ports".to_string(),
            format!("{} (tcp {}, udp {})", count.all, count.tcp, count.udp).normal(),
        ),
    ]
}

fn scan_config_details(config: &ScanConfig) -> Vec<Detail> {
    let mut details = vec![id(&config.id)];
    if let Some(comment) = &config.comment {
        details.push(("Comment".to_string(), comment.as_str().italic()));
    }
    details
}

fn scanner_details(scanner: &Scanner) -> Vec<Detail> {
    let mut details = vec![id(&scanner.id)];
    if let Some(host) = &scanner.host {
        details.push(("Host".to_string(), host.as_str().normal()));
    }
    details
}

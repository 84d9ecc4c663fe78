use colored::*;
use gvmkit_common::entities::{EntityId, Finding, FindingKey, Report};
use gvmkit_core::{ReportDelta, SeverityChange};

use crate::commands::Session;
use crate::gprint;
use crate::terminal::{colors, format, print};

pub async fn report(
    session: &Session,
    task: Option<EntityId>,
    report_id: Option<EntityId>,
) -> anyhow::Result<()> {
    let report = match (report_id, task) {
        (Some(report_id), _) => session.reports.fetch_report(&report_id).await?,
        (None, Some(task)) => session.reports.fetch_latest_report(&task).await?,
        (None, None) => anyhow::bail!("either a task or --id is required"),
    };
    if session.json {
        return print::json(&report);
    }
    print_report(&report);
    Ok(())
}

pub async fn delta(
    session: &Session,
    older: Option<EntityId>,
    newer: Option<EntityId>,
    task: Option<EntityId>,
) -> anyhow::Result<()> {
    let delta = match (older, newer, task) {
        (Some(older), Some(newer), _) => session.reports.delta_reports(&older, &newer).await?,
        (_, _, Some(task)) => session.reports.delta_latest(&task).await?,
        _ => anyhow::bail!("give two report ids or --task"),
    };
    if session.json {
        return print::json(&delta);
    }
    print_delta(&delta);
    Ok(())
}

fn print_report(report: &Report) {
    print::header("report");
    print::align_keys(["Report", "Task", "Created", "State", "Findings"]);
    print::aligned_line("Report", report.id.to_string().color(colors::IDENTIFIER));
    print::aligned_line("Task", report.task_id.to_string().color(colors::IDENTIFIER));
    print::aligned_line("Created", report.created_at.to_rfc3339());
    print::aligned_line("State", format::state(&report.scan_state));
    print::aligned_line("Findings", report.findings.len().to_string());

    if report.findings.is_empty() {
        print::no_results("findings");
        return;
    }

    print::header("findings");
    for (idx, finding) in report.findings.iter().enumerate() {
        print_finding(idx, finding);
        if idx + 1 != report.findings.len() {
            gprint!();
        }
    }
    print::end_of_program();
}

fn print_finding(idx: usize, finding: &Finding) {
    print::tree_head(idx, &format!("{} {}", finding.host, finding.name));
    print::as_tree_one_level(format::finding_details(finding));
}

fn print_delta(delta: &ReportDelta) {
    print::header("delta");
    print::align_keys(["Older", "Newer", "Unchanged"]);
    print::aligned_line("Older", delta.older.to_string().color(colors::IDENTIFIER));
    print::aligned_line("Newer", delta.newer.to_string().color(colors::IDENTIFIER));
    print::aligned_line("Unchanged", delta.delta.unchanged.to_string());

    if delta.delta.is_empty() {
        print::fat_separator();
        print::centerln("No differences between the reports", |s| s.bold().green());
        return;
    }

    section("added", delta.delta.added.iter(), "+", colors::ADDED);
    section("removed", delta.delta.removed.iter(), "-", colors::REMOVED);

    if !delta.delta.changed.is_empty() {
        print::header(&format!("changed ({})", delta.delta.changed.len()));
        for change in &delta.delta.changed {
            print_change(change);
        }
    }
    print::end_of_program();
}

fn section<'a>(title: &str, keys: impl ExactSizeIterator<Item = &'a FindingKey>, sign: &str, color: Color) {
    if keys.len() == 0 {
        return;
    }
    print::header(&format!("{title} ({})", keys.len()));
    for key in keys {
        print::print(&format!("{} {}", sign.color(color).bold(), key));
    }
}

fn print_change(change: &SeverityChange) {
    let arrow = if change.after > change.before { "↑" } else { "↓" };
    print::print(&format!(
        "{} {} {} {} {}",
        "~".color(colors::CHANGED).bold(),
        change.key,
        format::severity(change.before),
        arrow.color(colors::CHANGED),
        format::severity(change.after),
    ));
}

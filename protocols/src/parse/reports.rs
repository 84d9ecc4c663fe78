use chrono::{DateTime, Utc};
use gvmkit_common::GmpError;
use gvmkit_common::entities::{EntityId, Finding, Port, Report, ReportSummary, ScanState, Severity, ThreatLevel};

use super::{id_attr, optional_text, required_child, required_text};
use crate::xml::XmlNode;

fn timestamp(raw: &str) -> Result<DateTime<Utc>, GmpError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GmpError::protocol(format!("invalid timestamp '{raw}': {e}")))
}

/// The outer `<report>` carries metadata, the inner one carries scan data.
fn inner(outer: &XmlNode) -> Result<&XmlNode, GmpError> {
    required_child(outer, "report")
}

fn created_at(outer: &XmlNode, inner: &XmlNode) -> Result<DateTime<Utc>, GmpError> {
    match optional_text(outer, "creation_time") {
        Some(raw) => timestamp(&raw),
        None => timestamp(required_text(inner, "timestamp")?),
    }
}

fn scan_state(inner: &XmlNode) -> Result<ScanState, GmpError> {
    ScanState::from_remote(required_text(inner, "scan_run_status")?, None)
}

fn summary(outer: &XmlNode) -> Result<ReportSummary, GmpError> {
    let inner = inner(outer)?;
    Ok(ReportSummary {
        id: id_attr(outer)?,
        task_id: id_attr(required_child(outer, "task")?)?,
        created_at: created_at(outer, inner)?,
        scan_state: scan_state(inner)?,
    })
}

pub fn report_summaries(root: &XmlNode) -> Result<Vec<ReportSummary>, GmpError> {
    root.children_named("report").map(summary).collect()
}

fn cves(nvt: &XmlNode) -> Vec<String> {
    let mut cves: Vec<String> = nvt
        .child("refs")
        .into_iter()
        .flat_map(|refs| refs.children_named("ref"))
        .filter(|r| r.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("cve")))
        .filter_map(|r| r.attr("id"))
        .map(|id| id.trim().to_string())
        .collect();

    // managers before GMP 8 list CVEs as text
    if let Some(legacy) = nvt.child_text("cve") {
        cves.extend(
            legacy
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty() && *c != "NOCVE")
                .map(str::to_string),
        );
    }

    cves.sort();
    cves.dedup();
    cves
}

fn finding(node: &XmlNode) -> Result<Finding, GmpError> {
    let nvt = required_child(node, "nvt")?;
    let oid = nvt
        .attr("oid")
        .map(str::trim)
        .filter(|oid| !oid.is_empty())
        .ok_or_else(|| GmpError::protocol("result <nvt> has no oid"))?;

    let port: Port = required_text(node, "port")?.parse()?;
    let severity: Severity = required_text(node, "severity")?.parse()?;
    let threat: ThreatLevel = required_text(node, "threat")?.parse()?;

    Ok(Finding {
        host: required_text(node, "host")?.to_string(),
        port,
        vulnerability_id: oid.to_string(),
        name: required_text(node, "name")?.to_string(),
        severity,
        threat,
        description: optional_text(node, "description").unwrap_or_default(),
        cves: cves(nvt),
    })
}

/// Full report with findings in the order the manager sent them.
pub fn report(root: &XmlNode, report_id: &EntityId, format_id: &EntityId) -> Result<Report, GmpError> {
    let outer = root
        .child("report")
        .ok_or_else(|| GmpError::not_found(format!("report {report_id}")))?;
    let head = summary(outer)?;
    if &head.id != report_id {
        return Err(GmpError::protocol(format!(
            "asked for report {report_id}, manager answered with {}",
            head.id
        )));
    }

    let format_id = match outer.attr("format_id") {
        Some(raw) => EntityId::new(raw)?,
        None => format_id.clone(),
    };

    let findings = required_child(inner(outer)?, "results")?
        .children_named("result")
        .map(finding)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Report {
        id: head.id,
        task_id: head.task_id,
        created_at: head.created_at,
        scan_state: head.scan_state,
        format_id,
        findings,
    })
}

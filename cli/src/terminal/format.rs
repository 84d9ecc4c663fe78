use crate::terminal::colors;
use colored::*;
use gvmkit_common::entities::{EntityRef, Finding, ScanState, Severity, ThreatLevel};

type Detail = (String, ColoredString);

/// Color band by CVSS score, matching the manager's own severity classes.
pub fn severity_color(severity: Severity) -> Color {
    match severity.score() {
        s if s >= 9.0 => colors::CRITICAL,
        s if s >= 7.0 => colors::HIGH,
        s if s >= 4.0 => colors::MEDIUM,
        s if s > 0.0 => colors::LOW,
        _ => colors::INFORMATIONAL,
    }
}

pub fn severity(severity: Severity) -> ColoredString {
    severity.to_string().color(severity_color(severity)).bold()
}

pub fn threat(level: ThreatLevel) -> ColoredString {
    let color = match level {
        ThreatLevel::Critical => colors::CRITICAL,
        ThreatLevel::High => colors::HIGH,
        ThreatLevel::Medium => colors::MEDIUM,
        ThreatLevel::Low => colors::LOW,
        _ => colors::INFORMATIONAL,
    };
    level.to_string().color(color)
}

pub fn state(state: &ScanState) -> ColoredString {
    let text = state.to_string();
    match state {
        ScanState::Done => text.green().bold(),
        ScanState::Running { .. } | ScanState::Requested => text.cyan().bold(),
        ScanState::Stopped | ScanState::Interrupted => text.yellow().bold(),
        ScanState::Error => text.red().bold(),
        ScanState::Unstarted => text.normal(),
    }
}

/// `name (id)`, or just the id when the manager sent no name.
pub fn entity_ref(entity: &EntityRef) -> ColoredString {
    let id = entity.id.to_string().color(colors::IDENTIFIER);
    match &entity.name {
        Some(name) => format!("{name} ({id})").normal(),
        None => id,
    }
}

pub fn finding_details(finding: &Finding) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("Port".to_string(), finding.port.to_string().normal()),
        ("Severity".to_string(), severity(finding.severity)),
        ("Threat".to_string(), threat(finding.threat)),
        ("NVT".to_string(), finding.vulnerability_id.color(colors::IDENTIFIER)),
    ];
    if !finding.cves.is_empty() {
        details.push(("CVEs".to_string(), finding.cves.join(", ").normal()));
    }
    details
}

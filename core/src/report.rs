//! # Report Service
//!
//! Fetches reports and normalizes their findings into the canonical order:
//! host (lexicographic), port (numeric, `general` first), vulnerability id.
//! Delta computation depends on this order being stable.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use gvmkit_common::config::ReportOptions;
use gvmkit_common::entities::{EntityId, Finding, Report, ReportSummary};
use gvmkit_common::{GmpError, Result};
use serde::Serialize;
use tracing::debug;

use crate::adapter::ProtocolAdapter;
use crate::delta::{Delta, delta};

/// Result of comparing two reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDelta {
    pub older: EntityId,
    pub newer: EntityId,
    #[serde(flatten)]
    pub delta: Delta,
}

/// Sorts findings canonically and makes them key-unique.
///
/// When a key occurs twice the finding with the higher severity is kept; on
/// equal severity the first one seen stays.
pub fn normalize(findings: Vec<Finding>) -> Vec<Finding> {
    let mut unique: BTreeMap<_, Finding> = BTreeMap::new();
    for finding in findings {
        match unique.entry(finding.key()) {
            Entry::Vacant(slot) => {
                slot.insert(finding);
            }
            Entry::Occupied(mut slot) => {
                debug!(key = %slot.key(), "duplicate finding in report");
                if finding.severity > slot.get().severity {
                    slot.insert(finding);
                }
            }
        }
    }
    unique.into_values().collect()
}

/// Newest first: creation time descending, then id descending.
fn newest_first(a: &ReportSummary, b: &ReportSummary) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

#[derive(Clone)]
pub struct ReportService {
    adapter: ProtocolAdapter,
    options: ReportOptions,
}

impl ReportService {
    pub fn new(adapter: ProtocolAdapter, options: ReportOptions) -> Self {
        Self { adapter, options }
    }

    /// Completed reports of a task, newest first. Reports of runs still in
    /// progress are left out.
    pub async fn completed_reports(&self, task_id: &EntityId) -> Result<Vec<ReportSummary>> {
        let mut reports: Vec<ReportSummary> = self
            .adapter
            .get_reports(task_id)
            .await?
            .into_iter()
            .filter(|r| &r.task_id == task_id && r.is_complete())
            .collect();
        reports.sort_by(newest_first);
        Ok(reports)
    }

    pub async fn fetch_report(&self, report_id: &EntityId) -> Result<Report> {
        let mut report = self.adapter.get_report(report_id, &self.options).await?;
        let raw = report.findings.len();
        report.findings = normalize(report.findings);
        debug!(report = %report_id, raw, kept = report.findings.len(), "report normalized");
        Ok(report)
    }

    pub async fn fetch_latest_report(&self, task_id: &EntityId) -> Result<Report> {
        let latest = self
            .completed_reports(task_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GmpError::not_found(format!("task {task_id} has no completed report")))?;
        self.fetch_report(&latest.id).await
    }

    /// Fetches both reports and compares them.
    pub async fn delta_reports(&self, older: &EntityId, newer: &EntityId) -> Result<ReportDelta> {
        let before = self.fetch_report(older).await?;
        let after = self.fetch_report(newer).await?;
        Ok(ReportDelta {
            older: before.id,
            newer: after.id,
            delta: delta(&before.findings, &after.findings),
        })
    }

    /// Compares the two newest completed reports of a task.
    pub async fn delta_latest(&self, task_id: &EntityId) -> Result<ReportDelta> {
        let reports = self.completed_reports(task_id).await?;
        match reports.as_slice() {
            [newer, older, ..] => self.delta_reports(&older.id, &newer.id).await,
            _ => Err(GmpError::not_found(format!(
                "task {task_id} has fewer than two completed reports"
            ))),
        }
    }
}

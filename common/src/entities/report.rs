use chrono::{DateTime, Utc};
use serde::Serialize;

use super::finding::Finding;
use super::id::EntityId;
use super::task::ScanState;

/// Report metadata as returned by a report listing, without results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub id: EntityId,
    pub task_id: EntityId,
    pub created_at: DateTime<Utc>,
    pub scan_state: ScanState,
}

impl ReportSummary {
    /// A report is complete once its scan stopped producing results,
    /// whether it ran to the end or not.
    pub fn is_complete(&self) -> bool {
        matches!(
            self.scan_state,
            ScanState::Done | ScanState::Stopped | ScanState::Interrupted
        )
    }
}

/// A point-in-time snapshot of a task's results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub id: EntityId,
    pub task_id: EntityId,
    pub created_at: DateTime<Utc>,
    pub scan_state: ScanState,
    pub format_id: EntityId,
    pub findings: Vec<Finding>,
}

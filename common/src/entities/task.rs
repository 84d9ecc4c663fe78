use std::fmt;

use serde::Serialize;

use super::id::{EntityId, EntityRef};
use crate::error::GmpError;

/// Lifecycle of a scan task as seen by the orchestrator.
///
/// ```text
/// Unstarted ─start─▶ Requested ─confirmed─▶ Running ─▶ Done | Stopped | Interrupted | Error
///     ▲                                                              │
///     └──────────────────────── rescan ──────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    Unstarted,
    Requested,
    /// `progress` is `None` while gvmd has no figure for the run.
    Running {
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<u8>,
    },
    Stopped,
    Done,
    Interrupted,
    Error,
}

impl ScanState {
    /// Maps a gvmd `<status>` keyword onto a state.
    ///
    /// `progress` only matters for [`ScanState::Running`]. It stays unknown
    /// when gvmd reports none (`-1`, or a report's run status).
    pub fn from_remote(keyword: &str, progress: Option<u8>) -> Result<Self, GmpError> {
        let state = match keyword.trim() {
            "New" => ScanState::Unstarted,
            "Requested" | "Queued" => ScanState::Requested,
            "Running" | "Processing" | "Stop Requested" => ScanState::Running { progress },
            "Stopped" => ScanState::Stopped,
            "Done" => ScanState::Done,
            "Interrupted" => ScanState::Interrupted,
            "Internal Error" | "Delete Requested" | "Ultimate Delete Requested" => ScanState::Error,
            other => {
                return Err(GmpError::protocol(format!(
                    "unknown task status keyword '{other}'"
                )));
            }
        };
        Ok(state)
    }

    /// `Done`, `Stopped`, `Error` and `Interrupted` end an orchestration.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Done | ScanState::Stopped | ScanState::Error | ScanState::Interrupted
        )
    }

    /// A start has been issued and the scan has not ended yet.
    pub fn is_active(&self) -> bool {
        matches!(self, ScanState::Requested | ScanState::Running { .. })
    }

    pub fn progress(&self) -> Option<u8> {
        match self {
            ScanState::Running { progress } => *progress,
            ScanState::Done => Some(100),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Unstarted => "unstarted",
            ScanState::Requested => "requested",
            ScanState::Running { .. } => "running",
            ScanState::Stopped => "stopped",
            ScanState::Done => "done",
            ScanState::Interrupted => "interrupted",
            ScanState::Error => "error",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanState::Running {
                progress: Some(progress),
            } => write!(f, "running ({progress}%)"),
            other => f.write_str(other.name()),
        }
    }
}

/// A scan task: one target scanned with one scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: EntityId,
    pub name: String,
    pub target: EntityRef,
    pub config: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner: Option<EntityRef>,
    pub state: ScanState,
    pub finished_reports: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<EntityId>,
}

/// One status observation, as returned by a single status read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStatus {
    pub task_id: EntityId,
    #[serde(flatten)]
    pub state: ScanState,
}

/// Parameters of a `create_task` request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub target: EntityId,
    pub config: EntityId,
    pub scanner: EntityId,
    pub comment: Option<String>,
}

impl NewTask {
    pub fn for_target(target: &EntityRef, config: EntityId, scanner: EntityId) -> Self {
        let label = target.name.as_deref().unwrap_or(target.id.as_str());
        Self {
            name: format!("Scan {label} [{config}]"),
            target: target.id.clone(),
            config,
            scanner,
            comment: Some("created by gvmkit".to_string()),
        }
    }
}

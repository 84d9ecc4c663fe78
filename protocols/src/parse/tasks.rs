use gvmkit_common::GmpError;
use gvmkit_common::entities::{EntityId, EntityRef, ScanState, Task, TaskStatus};
use tracing::debug;

use super::{entity_ref, id_attr, number, optional_text, required_child, required_text};
use crate::xml::XmlNode;

/// Container tasks hold imported reports and have no target to scan.
fn is_container(node: &XmlNode) -> bool {
    node.child("target")
        .and_then(|t| t.attr("id"))
        .is_some_and(|id| id.trim().is_empty())
}

/// `-1` means the manager has no progress figure (task not running).
fn progress(node: &XmlNode) -> Result<Option<u8>, GmpError> {
    let raw: i32 = number(node, "progress")?;
    match raw {
        -1 => Ok(None),
        0..=100 => Ok(Some(raw as u8)),
        other => Err(GmpError::protocol(format!("task progress {other} out of range"))),
    }
}

fn state(node: &XmlNode) -> Result<ScanState, GmpError> {
    let keyword = required_text(node, "status")?;
    ScanState::from_remote(keyword, progress(node)?)
}

fn scanner(node: &XmlNode) -> Result<Option<EntityRef>, GmpError> {
    match node.child("scanner") {
        Some(s) if s.attr("id").is_some_and(|id| !id.trim().is_empty()) => {
            entity_ref(node, "scanner").map(Some)
        }
        _ => Ok(None),
    }
}

fn last_report(node: &XmlNode) -> Result<Option<EntityId>, GmpError> {
    node.descend(&["last_report", "report"])
        .map(id_attr)
        .transpose()
}

pub fn task(node: &XmlNode) -> Result<Task, GmpError> {
    let id = id_attr(node)?;
    if is_container(node) {
        return Err(GmpError::protocol(format!("task {id} is a container task")));
    }

    let finished_reports = required_child(node, "report_count")
        .and_then(|counts| number::<u32>(counts, "finished"))?;

    Ok(Task {
        name: required_text(node, "name")?.to_string(),
        target: entity_ref(node, "target")?,
        config: entity_ref(node, "config")?,
        scanner: scanner(node)?,
        state: state(node)?,
        finished_reports,
        last_report: last_report(node)?,
        id,
    })
}

/// Every scannable task in a listing. Container tasks are skipped.
pub fn tasks(root: &XmlNode) -> Result<Vec<Task>, GmpError> {
    root.children_named("task")
        .filter(|node| {
            let container = is_container(node);
            if container {
                debug!(task = node.attr("id").unwrap_or_default(), "skipping container task");
            }
            !container
        })
        .map(task)
        .collect()
}

/// Status snapshot of the single task a `get_tasks task_id=...` asked for.
pub fn task_status(root: &XmlNode, task_id: &EntityId) -> Result<TaskStatus, GmpError> {
    let node = single(root, task_id)?;
    Ok(TaskStatus {
        task_id: id_attr(node)?,
        state: state(node)?,
    })
}

pub(crate) fn single<'a>(root: &'a XmlNode, task_id: &EntityId) -> Result<&'a XmlNode, GmpError> {
    let node = root
        .child("task")
        .ok_or_else(|| GmpError::not_found(format!("task {task_id}")))?;
    let found = id_attr(node)?;
    if &found != task_id {
        return Err(GmpError::protocol(format!(
            "asked for task {task_id}, manager answered with {found}"
        )));
    }
    Ok(node)
}

/// Full task read for a single id.
pub fn single_task(root: &XmlNode, task_id: &EntityId) -> Result<Task, GmpError> {
    task(single(root, task_id)?)
}

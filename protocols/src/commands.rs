//! GMP request builders, one per command the core issues.
//!
//! Each builder returns the request document; the root element name is the
//! command name and `<command>_response` is the expected reply.

use gvmkit_common::entities::{EntityId, NewTarget, NewTask, PortSelection};

use crate::xml::XmlNode;

/// Appends `rows=-1` so listings are not cut at the manager's default page
/// size, unless the caller already chose a page size.
pub fn with_all_rows(filter: Option<&str>) -> String {
    let filter = filter.map(str::trim).unwrap_or_default();
    if filter.split_whitespace().any(|term| term.starts_with("rows=")) {
        return filter.to_string();
    }
    if filter.is_empty() {
        "rows=-1".to_string()
    } else {
        format!("{filter} rows=-1")
    }
}

pub fn get_version() -> XmlNode {
    XmlNode::new("get_version")
}

pub fn authenticate(username: &str, password: &str) -> XmlNode {
    XmlNode::new("authenticate").with_child(
        XmlNode::new("credentials")
            .with_text_child("username", username)
            .with_text_child("password", password),
    )
}

pub fn get_targets(filter: Option<&str>) -> XmlNode {
    XmlNode::new("get_targets").with_attr("filter", with_all_rows(filter))
}

pub fn get_target(target_id: &EntityId) -> XmlNode {
    XmlNode::new("get_targets").with_attr("target_id", target_id.as_str())
}

pub fn create_target(target: &NewTarget) -> XmlNode {
    let mut node = XmlNode::new("create_target")
        .with_text_child("name", target.name.as_str())
        .with_text_child("hosts", target.hosts.to_wire().join(","));
    node = match &target.ports {
        PortSelection::List(id) => node.with_child(XmlNode::new("port_list").with_attr("id", id.as_str())),
        PortSelection::Range(range) => node.with_text_child("port_range", range.to_string()),
    };
    if let Some(comment) = &target.comment {
        node = node.with_text_child("comment", comment.as_str());
    }
    node
}

pub fn get_tasks(filter: Option<&str>) -> XmlNode {
    XmlNode::new("get_tasks").with_attr("filter", with_all_rows(filter))
}

pub fn get_task(task_id: &EntityId) -> XmlNode {
    XmlNode::new("get_tasks")
        .with_attr("task_id", task_id.as_str())
        .with_attr("details", "1")
}

pub fn create_task(task: &NewTask) -> XmlNode {
    let mut node = XmlNode::new("create_task")
        .with_text_child("name", task.name.as_str())
        .with_child(XmlNode::new("config").with_attr("id", task.config.as_str()))
        .with_child(XmlNode::new("target").with_attr("id", task.target.as_str()))
        .with_child(XmlNode::new("scanner").with_attr("id", task.scanner.as_str()));
    if let Some(comment) = &task.comment {
        node = node.with_text_child("comment", comment.as_str());
    }
    node
}

pub fn start_task(task_id: &EntityId) -> XmlNode {
    XmlNode::new("start_task").with_attr("task_id", task_id.as_str())
}

pub fn stop_task(task_id: &EntityId) -> XmlNode {
    XmlNode::new("stop_task").with_attr("task_id", task_id.as_str())
}

/// Report metadata only; results are left out.
pub fn get_reports(filter: Option<&str>) -> XmlNode {
    XmlNode::new("get_reports")
        .with_attr("filter", with_all_rows(filter))
        .with_attr("details", "0")
        .with_attr("ignore_pagination", "1")
}

/// Reports of one task, newest first.
pub fn get_task_reports(task_id: &EntityId) -> XmlNode {
    get_reports(Some(&format!("task_id={task_id} sort-reverse=date")))
}

pub fn get_report(report_id: &EntityId, format_id: &EntityId, filter: &str) -> XmlNode {
    XmlNode::new("get_reports")
        .with_attr("report_id", report_id.as_str())
        .with_attr("format_id", format_id.as_str())
        .with_attr("filter", with_all_rows(Some(filter)))
        .with_attr("details", "1")
        .with_attr("ignore_pagination", "1")
}

pub fn get_port_lists(filter: Option<&str>) -> XmlNode {
    XmlNode::new("get_port_lists")
        .with_attr("filter", with_all_rows(filter))
        .with_attr("details", "1")
}

pub fn get_scan_configs(filter: Option<&str>) -> XmlNode {
    XmlNode::new("get_configs")
        .with_attr("filter", with_all_rows(filter))
        .with_attr("usage_type", "scan")
}

pub fn get_scanners(filter: Option<&str>) -> XmlNode {
    XmlNode::new("get_scanners").with_attr("filter", with_all_rows(filter))
}

//! # Response Parsers
//!
//! Strict, parse-or-fail constructors that turn a checked response tree into
//! entities. A missing required element, an unparsable value or an unknown
//! keyword yields [`GmpError::Protocol`]; no field is ever defaulted.
//!
//! Every function here expects the root `<command>_response` node, already
//! validated by [`crate::response::check`].

use gvmkit_common::GmpError;
use gvmkit_common::entities::{EntityId, EntityRef};

use crate::xml::XmlNode;

mod catalog;
mod reports;
mod targets;
mod tasks;

pub use catalog::{port_lists, scan_configs, scanners, version};
pub use reports::{report, report_summaries};
pub use targets::{reusable_targets, target, targets};
pub use tasks::{single_task, task, task_status, tasks};

pub(crate) fn required_child<'a>(node: &'a XmlNode, name: &str) -> Result<&'a XmlNode, GmpError> {
    node.child(name)
        .ok_or_else(|| GmpError::protocol(format!("<{}> lacks <{name}>", node.name)))
}

/// Trimmed, non-empty text of a required child element.
pub(crate) fn required_text<'a>(node: &'a XmlNode, name: &str) -> Result<&'a str, GmpError> {
    let text = required_child(node, name)?.text.trim();
    if text.is_empty() {
        return Err(GmpError::protocol(format!("<{}>/<{name}> is empty", node.name)));
    }
    Ok(text)
}

/// Text of an optional child; absent and empty both read as `None`.
pub(crate) fn optional_text(node: &XmlNode, name: &str) -> Option<String> {
    node.child_text(name)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub(crate) fn id_attr(node: &XmlNode) -> Result<EntityId, GmpError> {
    let raw = node
        .attr("id")
        .ok_or_else(|| GmpError::protocol(format!("<{}> has no id", node.name)))?;
    EntityId::new(raw).map_err(|e| GmpError::protocol(format!("<{}>: {e}", node.name)))
}

/// A `<name id="..."><name>...</name></name>` reference.
pub(crate) fn entity_ref(node: &XmlNode, name: &str) -> Result<EntityRef, GmpError> {
    let child = required_child(node, name)?;
    Ok(EntityRef {
        id: id_attr(child)?,
        name: optional_text(child, "name"),
    })
}

pub(crate) fn number<T: std::str::FromStr>(node: &XmlNode, name: &str) -> Result<T, GmpError>
where
    T::Err: std::fmt::Display,
{
    let raw = required_text(node, name)?;
    raw.parse()
        .map_err(|e| GmpError::protocol(format!("<{}>/<{name}> '{raw}': {e}", node.name)))
}

/// Id of the entity a `create_*` command made.
pub fn created_id(root: &XmlNode) -> Result<EntityId, GmpError> {
    id_attr(root)
}

/// Report id announced by `start_task`, when the manager sends one.
pub fn started_report(root: &XmlNode) -> Result<Option<EntityId>, GmpError> {
    match root.child_text("report_id").map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => EntityId::new(raw).map(Some),
    }
}

use gvmkit_common::GmpError;
use gvmkit_common::entities::{HostSpec, Target};
use tracing::debug;

use super::{entity_ref, id_attr, optional_text, required_text};
use crate::xml::XmlNode;

pub fn target(node: &XmlNode) -> Result<Target, GmpError> {
    let id = id_attr(node)?;
    let hosts: HostSpec = required_text(node, "hosts")?
        .parse()
        .map_err(|e| GmpError::protocol(format!("target {id}: {e}")))?;

    Ok(Target {
        name: required_text(node, "name")?.to_string(),
        hosts,
        port_list: entity_ref(node, "port_list")?,
        comment: optional_text(node, "comment"),
        id,
    })
}

pub fn targets(root: &XmlNode) -> Result<Vec<Target>, GmpError> {
    root.children_named("target").map(target).collect()
}

/// The targets of a listing that can be matched against a host set.
///
/// Targets other clients created may use host syntax gvmkit does not model;
/// they can never be reused, so they are skipped instead of failing the
/// listing.
pub fn reusable_targets(root: &XmlNode) -> Vec<Target> {
    root.children_named("target")
        .filter_map(|node| match target(node) {
            Ok(target) => Some(target),
            Err(err) => {
                debug!(target = node.attr("id").unwrap_or_default(), error = %err, "skipping target");
                None
            }
        })
        .collect()
}

use gvmkit_common::GmpError;
use gvmkit_common::entities::{PortCount, PortList, ScanConfig, Scanner};

use super::{id_attr, number, optional_text, required_child, required_text};
use crate::xml::XmlNode;

pub fn version(root: &XmlNode) -> Result<String, GmpError> {
    required_text(root, "version").map(str::to_string)
}

fn port_list(node: &XmlNode) -> Result<PortList, GmpError> {
    let counts = required_child(node, "port_count")?;
    Ok(PortList {
        id: id_attr(node)?,
        name: required_text(node, "name")?.to_string(),
        port_count: PortCount {
            all: number(counts, "all")?,
            tcp: number(counts, "tcp")?,
            udp: number(counts, "udp")?,
        },
    })
}

pub fn port_lists(root: &XmlNode) -> Result<Vec<PortList>, GmpError> {
    root.children_named("port_list").map(port_list).collect()
}

pub fn scan_configs(root: &XmlNode) -> Result<Vec<ScanConfig>, GmpError> {
    root.children_named("config")
        .map(|node| {
            Ok::<_, GmpError>(ScanConfig {
                id: id_attr(node)?,
                name: required_text(node, "name")?.to_string(),
                comment: optional_text(node, "comment"),
            })
        })
        .collect()
}

pub fn scanners(root: &XmlNode) -> Result<Vec<Scanner>, GmpError> {
    root.children_named("scanner")
        .map(|node| {
            Ok::<_, GmpError>(Scanner {
                id: id_attr(node)?,
                name: required_text(node, "name")?.to_string(),
                host: optional_text(node, "host"),
            })
        })
        .collect()
}

use serde::Serialize;

use super::hosts::HostSpec;
use super::id::{EntityId, EntityRef};
use super::ports::PortSelection;

/// A named set of hosts bound to the port list they are scanned with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub id: EntityId,
    pub name: String,
    pub hosts: HostSpec,
    pub port_list: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Target {
    /// Whether this target scans exactly `hosts` with port list `port_list`.
    pub fn covers(&self, hosts: &HostSpec, port_list: &EntityId) -> bool {
        &self.port_list.id == port_list && &self.hosts == hosts
    }
}

/// Parameters of a `create_target` request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTarget {
    pub name: String,
    pub hosts: HostSpec,
    pub ports: PortSelection,
    pub comment: Option<String>,
}

/// The target a scan asks for: which hosts, which ports and, optionally,
/// the name to give it.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRequest {
    pub hosts: HostSpec,
    pub ports: PortSelection,
    pub name: Option<String>,
}

impl TargetRequest {
    pub fn new(hosts: HostSpec, ports: PortSelection) -> Self {
        Self {
            hosts,
            ports,
            name: None,
        }
    }

    pub fn with_port_list(hosts: HostSpec, port_list: EntityId) -> Self {
        Self::new(hosts, PortSelection::List(port_list))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into().trim().to_string());
        self
    }

    /// The caller's name, or one derived from hosts and ports.
    ///
    /// Deriving the name from the inputs means two racing creators collide on
    /// the manager's name uniqueness rule instead of silently producing twins.
    pub fn target_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("gvmkit {} [{}]", self.hosts, self.ports),
        }
    }

    /// Whether `target` already serves this request.
    ///
    /// A port range becomes a port list the manager generates, so range
    /// targets are recognised by their name.
    pub fn matches(&self, target: &Target) -> bool {
        match &self.ports {
            PortSelection::List(port_list) => {
                target.covers(&self.hosts, port_list)
                    && self.name.as_ref().is_none_or(|name| *name == target.name)
            }
            PortSelection::Range(_) => {
                target.hosts == self.hosts && target.name == self.target_name()
            }
        }
    }

    pub fn new_target(&self) -> NewTarget {
        NewTarget {
            name: self.target_name(),
            hosts: self.hosts.clone(),
            ports: self.ports.clone(),
            comment: Some("created by gvmkit".to_string()),
        }
    }
}

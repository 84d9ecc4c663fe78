//! Small read-only resources the caller needs to pick identifiers for a scan.

use serde::Serialize;

use super::id::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortList {
    pub id: EntityId,
    pub name: String,
    pub port_count: PortCount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PortCount {
    pub all: u32,
    pub tcp: u32,
    pub udp: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanConfig {
    pub id: EntityId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scanner {
    pub id: EntityId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

//! # Entity Catalog
//!
//! Typed representations of the resources a Greenbone manager exposes.
//!
//! Every value type here validates on construction (`new`/`FromStr`), so a
//! value that exists is a value that is well-formed. Mapping the XML payload
//! onto these types lives in `gvmkit-protocols`.

mod catalog;
mod finding;
mod hosts;
mod id;
mod ports;
mod report;
mod target;
mod task;

pub use catalog::{PortCount, PortList, ScanConfig, Scanner};
pub use finding::{Finding, FindingKey, Port, Severity, ThreatLevel};
pub use hosts::{HostEntry, HostSpec};
pub use id::{EntityId, EntityRef};
pub use ports::{PortProtocol, PortRange, PortSelection, PortSpan};
pub use report::{Report, ReportSummary};
pub use target::{NewTarget, Target, TargetRequest};
pub use task::{NewTask, ScanState, Task, TaskStatus};

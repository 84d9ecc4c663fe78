//! # gvmkit Core
//!
//! Drives a Greenbone manager through typed operations.
//!
//! * [`channel`]: the session port and its Unix-socket adapter.
//! * [`adapter`]: one typed method per GMP command.
//! * [`orchestrator`]: target/task lookup-or-create and the scan lifecycle.
//! * [`report`]: report selection and normalization.
//! * [`delta`]: pure report comparison.
//! * [`watch`]: cadence polling on top of the orchestrator.
//!
//! ## Dependency Rule
//! Everything above [`channel`] talks to gvmd only through
//! [`channel::SessionChannel`], so tests substitute a fake channel.

pub mod adapter;
pub mod channel;
pub mod delta;
pub mod orchestrator;
pub mod report;
pub mod watch;

pub use adapter::ProtocolAdapter;
pub use channel::{ChannelError, SessionChannel, SharedChannel, UnixSessionChannel};
pub use delta::{Delta, SeverityChange};
pub use orchestrator::ScanOrchestrator;
pub use report::{ReportDelta, ReportService};
pub use watch::{PollPolicy, StatusWatcher, WatchEnd, WatchOutcome};

//! # Protocol Adapter
//!
//! One method per GMP command. Each method issues exactly one request over the
//! shared channel, validates the response envelope and parses the payload
//! strictly. The adapter keeps no state besides the channel handle.

use gvmkit_common::Result;
use gvmkit_common::GmpError;
use gvmkit_common::config::ReportOptions;
use gvmkit_common::entities::{
    EntityId, NewTarget, NewTask, PortList, Report, ReportSummary, ScanConfig, Scanner, Target,
    Task, TaskStatus,
};
use gvmkit_protocols::{XmlNode, commands, parse, response};
use tracing::debug;

use crate::channel::SharedChannel;

#[derive(Clone)]
pub struct ProtocolAdapter {
    channel: SharedChannel,
}

impl ProtocolAdapter {
    pub fn new(channel: SharedChannel) -> Self {
        Self { channel }
    }

    async fn call(&self, request: XmlNode) -> Result<XmlNode> {
        debug!(command = %request.name, "gmp request");
        let root = {
            let mut channel = self.channel.lock().await;
            channel.exchange(&request).await?
        };
        response::check(&request.name, &root)?;
        Ok(root)
    }

    pub async fn get_version(&self) -> Result<String> {
        parse::version(&self.call(commands::get_version()).await?)
    }

    pub async fn get_targets(&self, filter: Option<&str>) -> Result<Vec<Target>> {
        parse::targets(&self.call(commands::get_targets(filter)).await?)
    }

    /// Listing for reuse lookups: targets that fail to parse are left out.
    pub async fn get_reusable_targets(&self) -> Result<Vec<Target>> {
        let root = self.call(commands::get_targets(None)).await?;
        Ok(parse::reusable_targets(&root))
    }

    pub async fn get_target(&self, target_id: &EntityId) -> Result<Target> {
        let root = self.call(commands::get_target(target_id)).await?;
        parse::targets(&root)?
            .into_iter()
            .find(|t| &t.id == target_id)
            .ok_or_else(|| GmpError::not_found(format!("target {target_id}")))
    }

    pub async fn create_target(&self, target: &NewTarget) -> Result<EntityId> {
        parse::created_id(&self.call(commands::create_target(target)).await?)
    }

    pub async fn get_tasks(&self, filter: Option<&str>) -> Result<Vec<Task>> {
        parse::tasks(&self.call(commands::get_tasks(filter)).await?)
    }

    pub async fn get_task(&self, task_id: &EntityId) -> Result<Task> {
        parse::single_task(&self.call(commands::get_task(task_id)).await?, task_id)
    }

    pub async fn get_task_status(&self, task_id: &EntityId) -> Result<TaskStatus> {
        parse::task_status(&self.call(commands::get_task(task_id)).await?, task_id)
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<EntityId> {
        parse::created_id(&self.call(commands::create_task(task)).await?)
    }

    /// Returns the id of the report the run will write, when announced.
    pub async fn start_task(&self, task_id: &EntityId) -> Result<Option<EntityId>> {
        parse::started_report(&self.call(commands::start_task(task_id)).await?)
    }

    pub async fn stop_task(&self, task_id: &EntityId) -> Result<()> {
        self.call(commands::stop_task(task_id)).await.map(|_| ())
    }

    pub async fn get_reports(&self, task_id: &EntityId) -> Result<Vec<ReportSummary>> {
        parse::report_summaries(&self.call(commands::get_task_reports(task_id)).await?)
    }

    pub async fn get_report(&self, report_id: &EntityId, options: &ReportOptions) -> Result<Report> {
        let request = commands::get_report(report_id, &options.format, &options.filter);
        parse::report(&self.call(request).await?, report_id, &options.format)
    }

    pub async fn get_port_lists(&self, filter: Option<&str>) -> Result<Vec<PortList>> {
        parse::port_lists(&self.call(commands::get_port_lists(filter)).await?)
    }

    pub async fn get_scan_configs(&self, filter: Option<&str>) -> Result<Vec<ScanConfig>> {
        parse::scan_configs(&self.call(commands::get_scan_configs(filter)).await?)
    }

    pub async fn get_scanners(&self, filter: Option<&str>) -> Result<Vec<Scanner>> {
        parse::scanners(&self.call(commands::get_scanners(filter)).await?)
    }
}

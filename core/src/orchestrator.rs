//! # Scan Orchestrator
//!
//! Drives the scan lifecycle over [`ProtocolAdapter`] calls:
//!
//! ```text
//! Unstarted ──start──▶ Requested ──confirmed──▶ Running ──▶ Done | Stopped | Interrupted | Error
//!     ▲                                                             │
//!     └──────────────────────────── rescan ─────────────────────────┘
//! ```
//!
//! No operation here blocks for the duration of a scan. `start_scan` returns
//! after the start acknowledgement and `poll_status` is one round trip.
//! Repeating polls on a cadence belongs to the caller (see [`crate::watch`]).
//!
//! ## Local state
//! The orchestrator remembers the last state it reported per task so it can
//! smooth over two remote races:
//! * right after `start_task` the manager may still answer `New`; we keep
//!   reporting `Requested` until it moves on.
//! * progress must not go backwards; a lower or missing figure is logged
//!   and the previous one kept.

use std::collections::HashMap;

use gvmkit_common::entities::{
    EntityId, EntityRef, HostSpec, NewTask, PortList, PortSelection, ScanConfig, ScanState, Scanner,
    Target, TargetRequest, Task, TaskStatus,
};
use gvmkit_common::{GmpError, Result};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::adapter::ProtocolAdapter;

pub struct ScanOrchestrator {
    adapter: ProtocolAdapter,
    scanner: EntityId,
    states: Mutex<HashMap<EntityId, ScanState>>,
}

impl ScanOrchestrator {
    /// `scanner` is used for every task this orchestrator creates.
    pub fn new(adapter: ProtocolAdapter, scanner: EntityId) -> Self {
        Self {
            adapter,
            scanner,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn adapter(&self) -> &ProtocolAdapter {
        &self.adapter
    }

    async fn find_target(&self, request: &TargetRequest) -> Result<Option<Target>> {
        let targets = self.adapter.get_reusable_targets().await?;
        Ok(targets.into_iter().find(|t| request.matches(t)))
    }

    /// Returns the target scanning `hosts` with `port_list`, creating it if
    /// none exists.
    pub async fn ensure_target(&self, hosts: &HostSpec, port_list: &EntityId) -> Result<Target> {
        let request = TargetRequest::with_port_list(hosts.clone(), port_list.clone());
        self.ensure_target_for(&request).await
    }

    /// Lookup-or-create for any [`TargetRequest`], including inline port
    /// ranges and caller-chosen names.
    ///
    /// A duplicate-name rejection means a concurrent caller created it first;
    /// the lookup is repeated instead of failing. This is best effort: the
    /// manager does not offer an atomic create-if-absent.
    pub async fn ensure_target_for(&self, request: &TargetRequest) -> Result<Target> {
        if let Some(target) = self.find_target(request).await? {
            return Ok(target);
        }

        let new = request.new_target();
        let created = self.adapter.create_target(&new).await;
        match created {
            Ok(id) => {
                info!(target = %id, hosts = %request.hosts, ports = %request.ports, "created target");
                match new.ports {
                    PortSelection::List(port_list) => Ok(Target {
                        id,
                        name: new.name,
                        hosts: new.hosts,
                        port_list: EntityRef::new(port_list),
                        comment: new.comment,
                    }),
                    // the port list was generated by the manager
                    PortSelection::Range(_) => self.adapter.get_target(&id).await,
                }
            }
            Err(err) if err.is_duplicate_name() => {
                warn!(hosts = %request.hosts, "target appeared concurrently, looking it up again");
                self.find_target(request).await?.ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn find_task(&self, target: &EntityId, config: &EntityId) -> Result<Option<Task>> {
        let tasks = self.adapter.get_tasks(None).await?;
        Ok(tasks
            .into_iter()
            .find(|t| &t.target.id == target && &t.config.id == config))
    }

    /// Lookup-or-create for the task binding `target` to `config`.
    pub async fn ensure_task(&self, target: &Target, config: &EntityId) -> Result<Task> {
        if let Some(task) = self.find_task(&target.id, config).await? {
            return Ok(task);
        }

        let target_ref = EntityRef {
            id: target.id.clone(),
            name: Some(target.name.clone()),
        };
        let new = NewTask::for_target(&target_ref, config.clone(), self.scanner.clone());
        let created = self.adapter.create_task(&new).await;
        match created {
            Ok(id) => {
                info!(task = %id, target = %target.id, "created task");
                Ok(Task {
                    id,
                    name: new.name,
                    target: target_ref,
                    config: EntityRef::new(new.config),
                    scanner: Some(EntityRef::new(new.scanner)),
                    state: ScanState::Unstarted,
                    finished_reports: 0,
                    last_report: None,
                })
            }
            Err(err) if err.is_duplicate_name() => {
                warn!(target = %target.id, "task appeared concurrently, looking it up again");
                self.find_task(&target.id, config).await?.ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Ensures target and task exist, then starts the task. Returns as soon
    /// as the manager acknowledged the start.
    pub async fn start_scan(
        &self,
        hosts: &HostSpec,
        port_list: &EntityId,
        config: &EntityId,
    ) -> Result<EntityId> {
        let request = TargetRequest::with_port_list(hosts.clone(), port_list.clone());
        self.start_scan_for(&request, config).await
    }

    /// [`Self::start_scan`] for any [`TargetRequest`].
    pub async fn start_scan_for(&self, request: &TargetRequest, config: &EntityId) -> Result<EntityId> {
        let target = self.ensure_target_for(request).await?;
        let task = self.ensure_task(&target, config).await?;
        let state = self.reconcile(&task.id, task.state).await;
        if state.is_active() {
            return Err(invalid_state(&task.id, state, "start"));
        }
        self.start(&task.id).await?;
        Ok(task.id)
    }

    /// Starts an existing task again. Only allowed once the previous run ended.
    pub async fn rescan(&self, task_id: &EntityId) -> Result<TaskStatus> {
        let status = self.poll_status(task_id).await?;
        if !status.state.is_terminal() {
            return Err(invalid_state(task_id, status.state, "rescan"));
        }
        self.start(task_id).await
    }

    /// Rescans whatever task scans `target_id`. When several do, the one with
    /// the most finished runs is picked, the first listed on a tie.
    pub async fn rescan_target(&self, target_id: &EntityId) -> Result<TaskStatus> {
        let task = self
            .adapter
            .get_tasks(None)
            .await?
            .into_iter()
            .filter(|t| &t.target.id == target_id)
            .rev()
            .max_by_key(|t| t.finished_reports)
            .ok_or_else(|| GmpError::not_found(format!("task for target {target_id}")))?;

        info!(target = %target_id, task = %task.id, "rescanning target");
        self.rescan(&task.id).await
    }

    /// Starts a task that is not currently running.
    pub async fn start_task(&self, task_id: &EntityId) -> Result<TaskStatus> {
        let status = self.poll_status(task_id).await?;
        if status.state.is_active() {
            return Err(invalid_state(task_id, status.state, "start"));
        }
        self.start(task_id).await
    }

    async fn start(&self, task_id: &EntityId) -> Result<TaskStatus> {
        let report = self.adapter.start_task(task_id).await?;
        match &report {
            Some(report) => info!(task = %task_id, report = %report, "scan requested"),
            None => info!(task = %task_id, "scan requested"),
        }
        self.record(task_id, ScanState::Requested).await;
        Ok(TaskStatus {
            task_id: task_id.clone(),
            state: ScanState::Requested,
        })
    }

    /// One status read. Errors leave the remembered state untouched.
    pub async fn poll_status(&self, task_id: &EntityId) -> Result<TaskStatus> {
        let observed = self.adapter.get_task_status(task_id).await?;
        let state = self.reconcile(task_id, observed.state).await;
        Ok(TaskStatus {
            task_id: observed.task_id,
            state,
        })
    }

    /// Asks the manager to stop a requested or running task.
    pub async fn stop_scan(&self, task_id: &EntityId) -> Result<TaskStatus> {
        let status = self.poll_status(task_id).await?;
        if !status.state.is_active() {
            return Err(invalid_state(task_id, status.state, "stop"));
        }
        self.adapter.stop_task(task_id).await?;
        info!(task = %task_id, "scan stop requested");
        self.record(task_id, ScanState::Stopped).await;
        Ok(TaskStatus {
            task_id: task_id.clone(),
            state: ScanState::Stopped,
        })
    }

    async fn record(&self, task_id: &EntityId, state: ScanState) {
        self.states.lock().await.insert(task_id.clone(), state);
    }

    /// Merges a remote observation with the last state reported for the task.
    async fn reconcile(&self, task_id: &EntityId, observed: ScanState) -> ScanState {
        let mut states = self.states.lock().await;
        let previous = states.get(task_id).copied();

        let state = match (previous, observed) {
            (Some(ScanState::Requested), ScanState::Unstarted) => ScanState::Requested,
            // "Stop Requested" reads as running until the manager finishes stopping
            (Some(ScanState::Stopped), ScanState::Running { .. }) => ScanState::Stopped,
            (
                Some(ScanState::Running {
                    progress: Some(before),
                }),
                ScanState::Running { progress: now },
            ) if now.is_none_or(|now| now < before) => {
                warn!(task = %task_id, before, now = ?now, "manager reported lower progress");
                ScanState::Running {
                    progress: Some(before),
                }
            }
            (_, observed) => observed,
        };

        states.insert(task_id.clone(), state);
        state
    }

    pub async fn list_targets(&self) -> Result<Vec<Target>> {
        self.adapter.get_targets(None).await
    }

    pub async fn get_target(&self, target_id: &EntityId) -> Result<Target> {
        self.adapter.get_target(target_id).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.adapter.get_tasks(None).await
    }

    pub async fn get_task(&self, task_id: &EntityId) -> Result<Task> {
        self.adapter.get_task(task_id).await
    }

    pub async fn list_port_lists(&self) -> Result<Vec<PortList>> {
        self.adapter.get_port_lists(None).await
    }

    pub async fn list_scan_configs(&self) -> Result<Vec<ScanConfig>> {
        self.adapter.get_scan_configs(None).await
    }

    pub async fn list_scanners(&self) -> Result<Vec<Scanner>> {
        self.adapter.get_scanners(None).await
    }

    pub async fn get_version(&self) -> Result<String> {
        self.adapter.get_version().await
    }
}

fn invalid_state(task_id: &EntityId, state: ScanState, operation: &'static str) -> GmpError {
    GmpError::InvalidState {
        task_id: task_id.to_string(),
        state: state.to_string(),
        operation,
    }
}

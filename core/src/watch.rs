//! # Status Watcher
//!
//! Repeats [`ScanOrchestrator::poll_status`] on a fixed cadence until the
//! task reaches a terminal state or the policy's limits run out. Each poll is
//! an independent round trip; nothing is held between ticks.

use std::time::Duration;

use gvmkit_common::entities::{EntityId, TaskStatus};
use gvmkit_common::{GmpError, Result};
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::warn;

use crate::orchestrator::ScanOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Upper bound on status reads, `None` for unbounded.
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
    /// Consecutive transient failures tolerated before giving up.
    pub max_transient_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: None,
            timeout: None,
            max_transient_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEnd {
    Terminal,
    AttemptsExhausted,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchOutcome {
    pub status: TaskStatus,
    pub attempts: u32,
    pub end: WatchEnd,
}

pub struct StatusWatcher<'a> {
    orchestrator: &'a ScanOrchestrator,
    policy: PollPolicy,
}

impl<'a> StatusWatcher<'a> {
    pub fn new(orchestrator: &'a ScanOrchestrator, policy: PollPolicy) -> Self {
        Self {
            orchestrator,
            policy,
        }
    }

    /// Polls until done, calling `on_status` with every observation.
    ///
    /// Non-transient errors end the watch immediately. Transient ones are
    /// retried on the next tick up to `max_transient_retries` times in a row.
    pub async fn watch<F>(&self, task_id: &EntityId, mut on_status: F) -> Result<WatchOutcome>
    where
        F: FnMut(&TaskStatus),
    {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts = 0u32;
        let mut transient_failures = 0u32;
        let mut last: Option<TaskStatus> = None;

        loop {
            ticker.tick().await;

            let timed_out = self
                .policy
                .timeout
                .is_some_and(|limit| attempts > 0 && started.elapsed() >= limit);
            if timed_out {
                return finish(task_id, last, attempts, WatchEnd::TimedOut);
            }

            attempts += 1;
            match self.orchestrator.poll_status(task_id).await {
                Ok(status) => {
                    transient_failures = 0;
                    on_status(&status);
                    let terminal = status.state.is_terminal();
                    last = Some(status);
                    if terminal {
                        return finish(task_id, last, attempts, WatchEnd::Terminal);
                    }
                }
                Err(err) if err.is_transient() && transient_failures < self.policy.max_transient_retries => {
                    transient_failures += 1;
                    warn!(task = %task_id, attempt = attempts, error = %err, "status read failed, retrying");
                }
                Err(err) => return Err(err),
            }

            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                return finish(task_id, last, attempts, WatchEnd::AttemptsExhausted);
            }
        }
    }
}

fn finish(
    task_id: &EntityId,
    last: Option<TaskStatus>,
    attempts: u32,
    end: WatchEnd,
) -> Result<WatchOutcome> {
    let status = last.ok_or_else(|| {
        GmpError::Transient(format!("no status observed for task {task_id} in {attempts} attempts"))
    })?;
    Ok(WatchOutcome {
        status,
        attempts,
        end,
    })
}

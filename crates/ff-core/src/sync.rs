//! Hand-off of finished tasks to the backend.
//!
//! Delivery is best-effort. The default [`SyncPolicy`] makes a single attempt
//! (at-most-once); local state is cleared whatever the outcome, and the
//! [`Delivery`] result is returned to the caller so a host can requeue.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::focus::{calculate_focus_score, dominant_domain, summarize_site_time};
use crate::task::Task;

/// A failed delivery attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("sync failed: {message}")]
pub struct SyncFailure {
    pub message: String,
}

impl SyncFailure {
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// A finished task with its derived metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub task: Task,
    pub focus_score: u8,
    pub site_summary: BTreeMap<String, i64>,
}

impl TaskSummary {
    /// Scores and summarizes a task whose time has been fully flushed.
    pub fn from_task(task: Task) -> Self {
        let focus_score = calculate_focus_score(&task);
        let site_summary = summarize_site_time(&task.site_time);
        Self {
            task,
            focus_score,
            site_summary,
        }
    }
}

/// JSON body posted to the activity endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub task_name: String,
    /// Hostname with the most committed time, or `"unknown"`.
    pub domain: String,
    /// Mirrors `task_name`.
    pub title: String,
    pub duration_ms: i64,
    pub focus_score: u8,
    pub tab_switches: u32,
    /// Task start in epoch milliseconds.
    pub timestamp: i64,
}

impl From<&TaskSummary> for SyncPayload {
    fn from(summary: &TaskSummary) -> Self {
        let task = &summary.task;
        Self {
            task_name: task.task_name.to_string(),
            domain: dominant_domain(&task.site_time),
            title: task.task_name.to_string(),
            duration_ms: task.total_active_time,
            focus_score: summary.focus_score,
            tab_switches: task.tab_switches,
            timestamp: task.start_timestamp,
        }
    }
}

/// Receives finished task payloads.
pub trait SyncSink {
    fn deliver(&self, payload: &SyncPayload) -> Result<(), SyncFailure>;
}

/// Sink that drops every payload. Used when sync is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSync;

impl SyncSink for DisabledSync {
    fn deliver(&self, payload: &SyncPayload) -> Result<(), SyncFailure> {
        debug!(task = %payload.task_name, "sync disabled, dropping payload");
        Ok(())
    }
}

/// How hard to try delivering a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
}

impl SyncPolicy {
    /// A single attempt; failures are logged and dropped.
    pub const fn at_most_once() -> Self {
        Self { max_attempts: 1 }
    }

    pub const fn with_attempts(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::at_most_once()
    }
}

/// Outcome of handing a payload to a [`SyncSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered { attempts: u32 },
    Failed { attempts: u32, error: SyncFailure },
}

impl Delivery {
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Delivers `payload`, retrying immediately up to the policy's attempt budget.
pub fn deliver(sink: &dyn SyncSink, payload: &SyncPayload, policy: SyncPolicy) -> Delivery {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match sink.deliver(payload) {
            Ok(()) => {
                debug!(task = %payload.task_name, attempt, "task summary delivered");
                return Delivery::Delivered { attempts: attempt };
            }
            Err(error) if attempt >= max_attempts => {
                warn!(
                    task = %payload.task_name,
                    attempts = attempt,
                    %error,
                    "giving up on task summary delivery"
                );
                return Delivery::Failed {
                    attempts: attempt,
                    error,
                };
            }
            Err(error) => {
                warn!(task = %payload.task_name, attempt, %error, "task summary delivery failed, retrying");
                attempt += 1;
            }
        }
    }
}

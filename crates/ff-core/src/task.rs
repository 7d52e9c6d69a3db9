//! Tasks - units of tracked work.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::TaskName;

/// One pause of a task. `resumed_at` stays `None` while the task sits in the
/// paused collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseInterval {
    /// Epoch milliseconds at which the task was paused.
    pub paused_at: i64,
    /// Epoch milliseconds at which the task was resumed.
    pub resumed_at: Option<i64>,
}

impl PauseInterval {
    /// Returns true while the interval has not been closed by a resume.
    pub const fn is_open(&self) -> bool {
        self.resumed_at.is_none()
    }
}

/// A unit of tracked work.
///
/// Counters only ever grow. Time in `total_active_time` and `site_time` is
/// committed time; the live, unflushed part of the current session lives in
/// [`SessionPointer`](crate::SessionPointer) until a boundary event flushes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task name.
    pub task_name: TaskName,

    /// Creation time in epoch milliseconds. Never changes.
    pub start_timestamp: i64,

    /// Committed active time in milliseconds.
    #[serde(default)]
    pub total_active_time: i64,

    /// Tab activations and completed navigations seen while active.
    #[serde(default)]
    pub tab_switches: u32,

    /// Committed dwell time per hostname in milliseconds.
    #[serde(default)]
    pub site_time: BTreeMap<String, i64>,

    /// Append-only pause log.
    #[serde(default)]
    pub pause_intervals: Vec<PauseInterval>,
}

impl Task {
    /// Creates a fresh task with all counters zeroed.
    pub const fn new(task_name: TaskName, now_ms: i64) -> Self {
        Self {
            task_name,
            start_timestamp: now_ms,
            total_active_time: 0,
            tab_switches: 0,
            site_time: BTreeMap::new(),
            pause_intervals: Vec::new(),
        }
    }

    /// Number of times this task has been paused.
    pub fn pause_count(&self) -> usize {
        self.pause_intervals.len()
    }

    /// Number of distinct hostnames with committed time.
    ///
    /// Zero-valued buckets, left by a flush right after start or resume, do
    /// not count.
    pub fn site_count(&self) -> usize {
        self.site_time.values().filter(|&&ms| ms > 0).count()
    }

    /// Returns true if the latest pause interval is still open.
    pub fn is_paused(&self) -> bool {
        self.pause_intervals.last().is_some_and(PauseInterval::is_open)
    }

    /// Commits `elapsed_ms` to both the hostname bucket and the total.
    ///
    /// Negative values are ignored so time is never subtracted.
    pub(crate) fn commit(&mut self, hostname: &str, elapsed_ms: i64) {
        let elapsed_ms = elapsed_ms.max(0);
        *self.site_time.entry(hostname.to_string()).or_insert(0) += elapsed_ms;
        self.total_active_time += elapsed_ms;
    }

    pub(crate) fn open_pause(&mut self, now_ms: i64) {
        self.pause_intervals.push(PauseInterval {
            paused_at: now_ms,
            resumed_at: None,
        });
    }

    /// Closes the open pause interval, if any.
    pub(crate) fn close_pause(&mut self, now_ms: i64) -> bool {
        match self.pause_intervals.last_mut() {
            Some(interval) if interval.is_open() => {
                interval.resumed_at = Some(now_ms);
                true
            }
            _ => false,
        }
    }
}

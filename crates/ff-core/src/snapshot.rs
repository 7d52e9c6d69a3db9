//! Read-only stats projection for polling UIs.

use serde::Serialize;

use crate::focus::{FocusLevel, calculate_focus_score};
use crate::session::ActiveState;
use crate::store::TrackerState;
use crate::task::Task;

/// The active task with its unflushed session time folded in.
///
/// Built from an [`ActiveState`] but deliberately not convertible back into
/// one, so live time can never be persisted by accident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveTask {
    #[serde(flatten)]
    task: Task,
    current_url: String,
    live_delta_ms: i64,
    focus_score: u8,
    focus_level: FocusLevel,
}

impl LiveTask {
    /// Projects `state` as it would look after a flush at `now_ms`.
    pub fn project(state: &ActiveState, now_ms: i64) -> Self {
        let mut task = state.task.clone();
        let live_delta_ms = match state.pending(now_ms) {
            Some(pending) => {
                task.commit(&pending.hostname, pending.elapsed_ms);
                pending.elapsed_ms
            }
            None => 0,
        };
        let focus_score = calculate_focus_score(&task);
        Self {
            task,
            current_url: state.session_pointer.current_url.clone(),
            live_delta_ms,
            focus_score,
            focus_level: FocusLevel::from_score(focus_score),
        }
    }

    pub const fn task(&self) -> &Task {
        &self.task
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// Milliseconds added on top of the committed totals.
    pub const fn live_delta_ms(&self) -> i64 {
        self.live_delta_ms
    }

    pub const fn focus_score(&self) -> u8 {
        self.focus_score
    }

    pub const fn focus_level(&self) -> FocusLevel {
        self.focus_level
    }
}

/// What `getStats` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub active_task: Option<LiveTask>,
    pub paused_tasks: Vec<Task>,
    pub is_tracking: bool,
}

impl Snapshot {
    /// Nothing active, nothing paused.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn project(state: &TrackerState, now_ms: i64) -> Self {
        let active_task = state
            .active
            .as_ref()
            .map(|active| LiveTask::project(active, now_ms));
        Self {
            is_tracking: active_task.is_some(),
            active_task,
            paused_tasks: state.paused.clone(),
        }
    }
}

//! Message-style command surface.
//!
//! Hosts that talk JSON send `{"action": "startTask", "taskName": "..."}` and
//! get back either `{"success": true}` or a stats snapshot.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::snapshot::Snapshot;
use crate::store::StateStore;
use crate::tracker::{Tracker, TrackerError};

/// A command sent by a UI host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Command {
    #[serde(rename = "startTask", rename_all = "camelCase")]
    Start { task_name: String },
    #[serde(rename = "pauseTask")]
    Pause,
    #[serde(rename = "resumeTask", rename_all = "camelCase")]
    Resume { task_name: String },
    #[serde(rename = "endTask")]
    End,
    #[serde(rename = "deleteTask", rename_all = "camelCase")]
    Delete { task_name: String },
    #[serde(rename = "getStats")]
    GetStats,
}

impl Command {
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Start { .. } => "startTask",
            Self::Pause => "pauseTask",
            Self::Resume { .. } => "resumeTask",
            Self::End => "endTask",
            Self::Delete { .. } => "deleteTask",
            Self::GetStats => "getStats",
        }
    }
}

/// Reply to a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ack {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Stats(Snapshot),
}

impl Response {
    pub const fn ok() -> Self {
        Self::Ack {
            success: true,
            error: None,
        }
    }

    pub fn failed(err: &TrackerError) -> Self {
        Self::Ack {
            success: false,
            error: Some(err.to_string()),
        }
    }

    /// False only for a failed acknowledgement.
    pub const fn is_success(&self) -> bool {
        match self {
            Self::Ack { success, .. } => *success,
            Self::Stats(_) => true,
        }
    }
}

impl<T> From<Result<T, TrackerError>> for Response {
    fn from(result: Result<T, TrackerError>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(err) => Self::failed(&err),
        }
    }
}

impl<S: StateStore> Tracker<S> {
    /// Runs one command. Failures are reported in the response, never
    /// returned.
    pub fn dispatch(&mut self, command: Command) -> Response {
        debug!(action = command.action(), "dispatching command");
        match command {
            Command::Start { task_name } => self.start_task(&task_name).into(),
            Command::Pause => self.pause_task().into(),
            Command::Resume { task_name } => self.resume_task(&task_name).into(),
            Command::End => self.end_task().into(),
            Command::Delete { task_name } => self.delete_task(&task_name).into(),
            Command::GetStats => Response::Stats(self.snapshot()),
        }
    }
}

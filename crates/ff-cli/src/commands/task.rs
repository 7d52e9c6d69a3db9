//! Lifecycle commands: start, pause, resume, end, delete.

use std::io::Write;

use anyhow::Result;
use ff_core::{Command, Response, StateStore, Tracker};

/// Runs a lifecycle command and prints the JSON acknowledgement.
///
/// Returns whether the command succeeded.
pub fn run<W: Write, S: StateStore>(
    writer: &mut W,
    tracker: &mut Tracker<S>,
    command: Command,
) -> Result<bool> {
    let response = tracker.dispatch(command);
    if let Response::Ack {
        error: Some(error), ..
    } = &response
    {
        tracing::debug!(%error, "command failed");
    }
    writeln!(writer, "{}", serde_json::to_string(&response)?)?;
    Ok(response.is_success())
}

//! Message-style bridge: one JSON command in, one JSON response out.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use ff_core::{Command, Response, StateStore, Tracker};

/// Reads a command from `reader`, dispatches it and writes the response.
///
/// A malformed command is answered with a failed acknowledgement rather than
/// an error. Returns whether the command succeeded.
pub fn run<R: Read, W: Write, S: StateStore>(
    reader: &mut R,
    writer: &mut W,
    tracker: &mut Tracker<S>,
) -> Result<bool> {
    let mut input = String::new();
    reader
        .read_to_string(&mut input)
        .context("failed to read command from stdin")?;

    let response = match serde_json::from_str::<Command>(&input) {
        Ok(command) => tracker.dispatch(command),
        Err(err) => {
            tracing::warn!(error = %err, "rejecting malformed command");
            Response::Ack {
                success: false,
                error: Some(format!("invalid command: {err}")),
            }
        }
    };

    writeln!(writer, "{}", serde_json::to_string(&response)?)?;
    Ok(response.is_success())
}

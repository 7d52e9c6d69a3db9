//! Tab event commands.

use anyhow::{Context, Result};
use ff_core::{StateStore, TabEvent, Tracker};

use crate::TabAction;

impl From<&TabAction> for TabEvent {
    fn from(action: &TabAction) -> Self {
        match action {
            TabAction::Activated { url } => Self::Activated { url: url.clone() },
            TabAction::Updated {
                url,
                status,
                inactive,
            } => Self::Updated {
                url: url.clone(),
                status: *status,
                active: !inactive,
            },
        }
    }
}

/// Feeds a tab event to the tracker.
pub fn run<S: StateStore>(tracker: &mut Tracker<S>, action: &TabAction) -> Result<()> {
    let event = TabEvent::from(action);
    match tracker.observe(&event).context("failed to record tab event")? {
        Some(flush) => tracing::debug!(
            host = %flush.hostname,
            elapsed_ms = flush.elapsed_ms,
            "tab event committed time"
        ),
        None => tracing::debug!("tab event recorded"),
    }
    Ok(())
}

//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ff_core::TabStatus;

/// Per-task browser time tracker.
///
/// Tracks how long each named task is worked on, which sites it touched and
/// how focused the work was, then syncs a summary when the task ends.
#[derive(Debug, Parser)]
#[command(name = "ff", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database and seed default settings.
    Init,

    /// Start a new task, pausing the current one.
    Start {
        /// Task name.
        name: String,

        /// URL currently in the foreground.
        #[arg(long)]
        url: Option<String>,
    },

    /// Pause the active task.
    Pause,

    /// Resume a paused task, pausing the current one.
    Resume {
        /// Task name.
        name: String,

        /// URL currently in the foreground.
        #[arg(long)]
        url: Option<String>,
    },

    /// End the active task and sync its summary.
    End,

    /// Discard a paused task without syncing.
    Delete {
        /// Task name.
        name: String,
    },

    /// Show the active and paused tasks.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Report a browser tab event.
    Tab {
        #[command(subcommand)]
        event: TabAction,
    },

    /// Read one JSON command from stdin and print the JSON response.
    Dispatch,
}

/// Tab events that can be reported.
#[derive(Debug, Subcommand)]
pub enum TabAction {
    /// A different tab became active.
    Activated {
        /// URL of the newly active tab.
        #[arg(long)]
        url: String,
    },

    /// A tab finished or started loading.
    Updated {
        /// URL of the tab.
        #[arg(long)]
        url: String,

        /// Loading status (`complete` or `loading`).
        #[arg(long, default_value_t = TabStatus::Complete)]
        status: TabStatus,

        /// The tab is in the background.
        #[arg(long)]
        inactive: bool,
    },
}

//! CLI subcommand implementations.

pub mod dispatch;
pub mod init;
pub mod stats;
pub mod tab;
pub mod task;
mod util;

//! `FocusFlow` CLI library.
//!
//! This crate provides the CLI interface for the task tracker.

pub mod app;
mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, TabAction};
pub use config::Config;

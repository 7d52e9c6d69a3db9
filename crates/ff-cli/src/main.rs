use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ff_core::Command;
use tracing_subscriber::EnvFilter;

use ff_cli::app::{open_reader, open_store, open_tracker};
use ff_cli::commands::{dispatch, init, stats, tab, task};
use ff_cli::{Cli, Commands, Config};

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so stdout stays machine-readable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = io::stdout().lock();
    let success = match cli.command {
        Some(Commands::Init) => {
            let mut store = open_store(&config)?;
            init::run(
                &mut stdout,
                &mut store,
                &config.database_path.display().to_string(),
            )?;
            true
        }
        Some(Commands::Start { name, url }) => {
            let mut tracker = open_tracker(&config, url.as_deref())?;
            task::run(&mut stdout, &mut tracker, Command::Start { task_name: name })?
        }
        Some(Commands::Pause) => {
            let mut tracker = open_tracker(&config, None)?;
            task::run(&mut stdout, &mut tracker, Command::Pause)?
        }
        Some(Commands::Resume { name, url }) => {
            let mut tracker = open_tracker(&config, url.as_deref())?;
            task::run(&mut stdout, &mut tracker, Command::Resume { task_name: name })?
        }
        Some(Commands::End) => {
            let mut tracker = open_tracker(&config, None)?;
            task::run(&mut stdout, &mut tracker, Command::End)?
        }
        Some(Commands::Delete { name }) => {
            let mut tracker = open_tracker(&config, None)?;
            task::run(&mut stdout, &mut tracker, Command::Delete { task_name: name })?
        }
        Some(Commands::Stats { json }) => {
            let tracker = open_reader(&config)?;
            stats::run(&mut stdout, &tracker.snapshot(), json)?;
            true
        }
        Some(Commands::Tab { event }) => {
            let mut tracker = open_tracker(&config, None)?;
            tab::run(&mut tracker, &event)?;
            true
        }
        Some(Commands::Dispatch) => {
            let mut tracker = open_tracker(&config, None)?;
            dispatch::run(&mut io::stdin().lock(), &mut stdout, &mut tracker)?
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            true
        }
    };

    Ok(exit_code(success))
}

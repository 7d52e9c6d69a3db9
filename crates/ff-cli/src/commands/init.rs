//! Init command for creating the database and seeding defaults.

use std::io::Write;

use anyhow::{Context, Result};
use ff_core::StateStore;
use ff_core::store::seed_defaults;

/// Seeds default keys into `store` and reports what was written.
pub fn run<W: Write, S: StateStore>(writer: &mut W, store: &mut S, database: &str) -> Result<()> {
    let written = seed_defaults(store).context("failed to seed defaults")?;

    writeln!(writer, "Database: {database}")?;
    if written.is_empty() {
        writeln!(writer, "Already initialized.")?;
    } else {
        writeln!(writer, "Seeded:   {}", written.join(", "))?;
    }

    Ok(())
}

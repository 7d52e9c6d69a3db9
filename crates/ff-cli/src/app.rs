//! Wiring of config, store, tab source and sync into a [`Tracker`].

use anyhow::{Context, Result};
use ff_core::store::load_foreground_tab;
use ff_core::{DisabledSync, SharedTab, SyncPolicy, Tracker};
use ff_db::SqliteStore;
use ff_sync::{Client, HttpSink};

use crate::Config;

/// Opens the configured store, creating its directory if necessary.
pub fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

fn tracker_over(store: SqliteStore, url: Option<&str>) -> Result<Tracker<SqliteStore>> {
    let foreground = match url {
        Some(url) => Some(url.to_string()),
        None => load_foreground_tab(&store).context("failed to read foreground tab")?,
    };
    Ok(Tracker::new(store).with_tab_source(SharedTab::new(foreground)))
}

/// Builds a tracker for read-only queries: no sync client and no startup
/// hook, so nothing is written to the store.
pub fn open_reader(config: &Config) -> Result<Tracker<SqliteStore>> {
    tracker_over(open_store(config)?, None)
}

/// Builds a tracker over the configured store.
///
/// The foreground tab is `url` when given, otherwise the last URL recorded
/// by `ff tab`. Runs the startup hook before returning.
pub fn open_tracker(config: &Config, url: Option<&str>) -> Result<Tracker<SqliteStore>> {
    let tracker = tracker_over(open_store(config)?, url)?
        .with_sync_policy(SyncPolicy::with_attempts(config.sync_attempts));

    let mut tracker = if config.sync_enabled {
        let client = Client::new(&config.api_url, config.sync_timeout())
            .context("failed to create sync client")?;
        tracker.with_sync(HttpSink::new(client).context("failed to create sync sink")?)
    } else {
        tracker.with_sync(DisabledSync)
    };

    tracker.on_startup().context("failed to restore session")?;
    Ok(tracker)
}

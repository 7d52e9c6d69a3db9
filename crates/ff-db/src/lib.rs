//! SQLite-backed state store for `FocusFlow`.
//!
//! Persists the tracker's key/value state using `rusqlite`, so an active task
//! survives process restarts.
//!
//! # Thread Safety
//!
//! [`SqliteStore`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. Move it between threads freely; share it behind a `Mutex`.
//!
//! # Schema
//!
//! A single `state` table keyed by store key. `value` holds the JSON text of
//! the entry and `updated_at` an ISO 8601 UTC timestamp of the last write
//! (e.g. `2024-01-15T10:30:00.000Z`). Values are opaque here; their shape is
//! owned by `ff-core`.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use ff_core::store::{Entries, StateStore, StoreError};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The database directory could not be created.
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::backend(err)
    }
}

/// Durable key/value store over a SQLite connection.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct SqliteStore {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteStore {
    /// Opens a store at the given path, creating the file and its parent
    /// directory if necessary.
    ///
    /// The schema is initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        debug!(path = %path.display(), "opened state store");
        Ok(store)
    }

    /// Opens an in-memory store, destroyed when dropped.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- key: store key (e.g. 'activeTaskState')
            -- value: JSON text
            -- updated_at: ISO 8601 UTC
            CREATE TABLE IF NOT EXISTS state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// All stored keys in ascending order.
    pub fn keys(&self) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare("SELECT key FROM state ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// When `key` was last written, if it exists.
    pub fn updated_at(&self, key: &str) -> Result<Option<String>, DbError> {
        let updated_at = self
            .conn
            .query_row(
                "SELECT updated_at FROM state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(updated_at)
    }

    fn read_raw(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_all(&mut self, rows: &[(String, String)]) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO state (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                ",
            )?;
            for (key, value) in rows {
                stmt.execute(params![key, value, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM state WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl StateStore for SqliteStore {
    fn get(&self, keys: &[&str]) -> Result<Entries, StoreError> {
        let mut entries = Entries::new();
        for key in keys {
            let Some(raw) = self.read_raw(key)? else {
                continue;
            };
            let value: Value = serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
                key: (*key).to_string(),
                source,
            })?;
            entries.insert((*key).to_string(), value);
        }
        Ok(entries)
    }

    fn set(&mut self, entries: Entries) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let rows: Vec<(String, String)> = entries
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        self.write_all(&rows)?;
        debug!(keys = rows.len(), "wrote state entries");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.delete(key)?;
        Ok(())
    }
}

//! Durable state store port.
//!
//! The tracker keeps no task data in process memory between commands: every
//! command reads the full state, mutates it and writes it back. Each key holds
//! an opaque JSON blob that is read and written atomically, and a multi-key
//! [`StateStore::set`] is applied all-or-nothing.
//!
//! # Keys
//!
//! | key               | value                                   |
//! |-------------------|-----------------------------------------|
//! | `activeTaskState` | [`ActiveState`] or `null`               |
//! | `pausedTasks`     | array of [`Task`], default `[]`         |
//! | `trackedSites`    | array of hostnames (settings UI only)   |
//! | `foregroundTab`   | last observed foreground URL            |

use std::collections::BTreeMap;
use std::error::Error as StdError;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::session::ActiveState;
use crate::task::Task;

pub const ACTIVE_TASK_KEY: &str = "activeTaskState";
pub const PAUSED_TASKS_KEY: &str = "pausedTasks";
pub const TRACKED_SITES_KEY: &str = "trackedSites";
pub const FOREGROUND_TAB_KEY: &str = "foregroundTab";

/// Sites seeded into `trackedSites` on first run.
pub const DEFAULT_TRACKED_SITES: &[&str] = &["github.com", "stackoverflow.com", "docs.google.com"];

/// Key/value pairs read from or written to a store.
pub type Entries = BTreeMap<String, Value>;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed to read or write.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
    /// A value could not be encoded for storage.
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// A stored value did not match the expected shape.
    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn backend(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Key/value persistence surviving process restarts.
pub trait StateStore {
    /// Reads the given keys. Missing keys are absent from the result.
    fn get(&self, keys: &[&str]) -> Result<Entries, StoreError>;

    /// Writes all entries atomically.
    fn set(&mut self, entries: Entries) -> Result<(), StoreError>;

    /// Deletes a key. Deleting a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: StateStore + ?Sized> StateStore for Box<S> {
    fn get(&self, keys: &[&str]) -> Result<Entries, StoreError> {
        (**self).get(keys)
    }

    fn set(&mut self, entries: Entries) -> Result<(), StoreError> {
        (**self).set(entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// In-process store, lost on drop.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Entries,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value stored under `key`.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }
}

impl StateStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<Entries, StoreError> {
        Ok(keys
            .iter()
            .filter_map(|key| {
                self.entries
                    .get(*key)
                    .map(|value| ((*key).to_string(), value.clone()))
            })
            .collect())
    }

    fn set(&mut self, entries: Entries) -> Result<(), StoreError> {
        self.entries.extend(entries);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

fn encode(key: &'static str, value: &impl Serialize) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Encode { key, source })
}

/// Decodes `key` from `entries`, treating absent and `null` as `None`.
fn decode<T: DeserializeOwned>(entries: &mut Entries, key: &str) -> Result<Option<T>, StoreError> {
    match entries.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            }),
    }
}

/// Task state as persisted under `activeTaskState` and `pausedTasks`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerState {
    pub active: Option<ActiveState>,
    pub paused: Vec<Task>,
}

impl TrackerState {
    /// Reads both task keys in a single store call.
    pub fn load<S: StateStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        let mut entries = store.get(&[ACTIVE_TASK_KEY, PAUSED_TASKS_KEY])?;
        Ok(Self {
            active: decode(&mut entries, ACTIVE_TASK_KEY)?,
            paused: decode(&mut entries, PAUSED_TASKS_KEY)?.unwrap_or_default(),
        })
    }

    /// Encodes both task keys; an absent active task is written as `null`.
    pub fn to_entries(&self) -> Result<Entries, StoreError> {
        let mut entries = Entries::new();
        entries.insert(ACTIVE_TASK_KEY.to_string(), encode(ACTIVE_TASK_KEY, &self.active)?);
        entries.insert(PAUSED_TASKS_KEY.to_string(), encode(PAUSED_TASKS_KEY, &self.paused)?);
        Ok(entries)
    }

    /// Writes both task keys in one atomic set.
    pub fn save<S: StateStore + ?Sized>(&self, store: &mut S) -> Result<(), StoreError> {
        store.set(self.to_entries()?)
    }

    /// Position of `name` in the paused collection.
    pub fn paused_position(&self, name: &str) -> Option<usize> {
        self.paused.iter().position(|task| task.task_name == name)
    }

    /// Returns true if `name` is the active task or a paused task.
    pub fn contains(&self, name: &str) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.task.task_name == name)
            || self.paused_position(name).is_some()
    }
}

/// Reads the last foreground URL recorded by the tab observer.
pub fn load_foreground_tab<S: StateStore + ?Sized>(store: &S) -> Result<Option<String>, StoreError> {
    let mut entries = store.get(&[FOREGROUND_TAB_KEY])?;
    decode(&mut entries, FOREGROUND_TAB_KEY)
}

/// Reads `trackedSites`, empty when unset.
pub fn load_tracked_sites<S: StateStore + ?Sized>(store: &S) -> Result<Vec<String>, StoreError> {
    let mut entries = store.get(&[TRACKED_SITES_KEY])?;
    Ok(decode(&mut entries, TRACKED_SITES_KEY)?.unwrap_or_default())
}

/// Writes defaults for keys that are not yet present. Returns the keys written.
///
/// Idempotent: existing values are never overwritten.
pub fn seed_defaults<S: StateStore + ?Sized>(store: &mut S) -> Result<Vec<&'static str>, StoreError> {
    let existing = store.get(&[PAUSED_TASKS_KEY, TRACKED_SITES_KEY])?;
    let mut entries = Entries::new();
    if !existing.contains_key(PAUSED_TASKS_KEY) {
        entries.insert(
            PAUSED_TASKS_KEY.to_string(),
            encode(PAUSED_TASKS_KEY, &Vec::<Task>::new())?,
        );
    }
    if !existing.contains_key(TRACKED_SITES_KEY) {
        entries.insert(
            TRACKED_SITES_KEY.to_string(),
            encode(TRACKED_SITES_KEY, &DEFAULT_TRACKED_SITES)?,
        );
    }
    let written = [PAUSED_TASKS_KEY, TRACKED_SITES_KEY]
        .into_iter()
        .filter(|key| entries.contains_key(*key))
        .collect();
    if !entries.is_empty() {
        store.set(entries)?;
    }
    Ok(written)
}

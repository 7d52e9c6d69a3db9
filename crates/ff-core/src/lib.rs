//! Core domain logic for `FocusFlow`.
//!
//! This crate contains:
//! - The task lifecycle state machine ([`Tracker`])
//! - Session time accumulation per hostname
//! - Focus scoring and site-time summarization
//! - The durable state store port and an in-memory implementation
//!
//! Nothing here performs I/O directly; the clock, foreground tab, store and
//! sync endpoint are injected.

pub mod command;
pub mod focus;
pub mod observer;
pub mod ports;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod task;
pub mod tracker;
pub mod types;

pub use command::{Command, Response};
pub use focus::{FocusLevel, calculate_focus_score, dominant_domain, summarize_site_time};
pub use observer::{TabEvent, TabStatus};
pub use ports::{ActiveTab, Clock, ManualClock, NoTab, SharedTab, SystemClock, TabSource};
pub use session::{ActiveState, Flush, SessionPointer, UrlError, extract_hostname};
pub use snapshot::{LiveTask, Snapshot};
pub use store::{Entries, MemoryStore, StateStore, StoreError, TrackerState};
pub use sync::{
    Delivery, DisabledSync, SyncFailure, SyncPayload, SyncPolicy, SyncSink, TaskSummary,
};
pub use task::{PauseInterval, Task};
pub use tracker::{EndReport, Tracker, TrackerError};
pub use types::{TaskName, ValidationError};

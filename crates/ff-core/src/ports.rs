//! Host environment ports: wall clock and foreground tab.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

/// Provides the current time in epoch milliseconds.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for tests and replays. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// The focused browser tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTab {
    pub url: String,
}

/// Answers "which tab is in the foreground right now".
pub trait TabSource {
    /// Returns `None` when no tab can be focused.
    fn active_tab(&self) -> Option<ActiveTab>;
}

/// Tab source that never reports a tab.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTab;

impl TabSource for NoTab {
    fn active_tab(&self) -> Option<ActiveTab> {
        None
    }
}

/// Tab source backed by a settable URL. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SharedTab {
    url: Arc<Mutex<Option<String>>>,
}

impl SharedTab {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: Arc::new(Mutex::new(url)),
        }
    }

    pub fn set(&self, url: impl Into<String>) {
        *self.url.lock().unwrap_or_else(PoisonError::into_inner) = Some(url.into());
    }

    pub fn clear(&self) {
        *self.url.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TabSource for SharedTab {
    fn active_tab(&self) -> Option<ActiveTab> {
        self.url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(|url| ActiveTab { url })
    }
}

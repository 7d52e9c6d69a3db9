//! Session time accumulation for the active task.
//!
//! The active task carries a [`SessionPointer`]: which URL is in the
//! foreground and since when. Time since `session_start_time` is live and
//! uncommitted until a boundary event (tab switch, pause, end) flushes it
//! into the task's committed totals.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::task::Task;

/// Hostname extraction failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// The URL could not be parsed at all.
    #[error("malformed URL {url:?}")]
    Malformed { url: String },
    /// The URL parsed but is not a web page (e.g. `chrome://`, `about:`).
    #[error("unsupported URL scheme {scheme:?} in {url:?}")]
    UnsupportedScheme { url: String, scheme: String },
    /// The URL has no host component.
    #[error("URL {url:?} has no host")]
    MissingHost { url: String },
}

/// Extracts the hostname used as a site-time bucket key.
///
/// Only `http` and `https` URLs with a host qualify.
pub fn extract_hostname(raw: &str) -> Result<String, UrlError> {
    let parsed = Url::parse(raw).map_err(|_| UrlError::Malformed {
        url: raw.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(UrlError::UnsupportedScheme {
                url: raw.to_string(),
                scheme: scheme.to_string(),
            });
        }
    }
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .ok_or_else(|| UrlError::MissingHost {
            url: raw.to_string(),
        })
}

/// Foreground URL and the moment attribution to it started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPointer {
    /// URL currently in the foreground, empty when unknown.
    #[serde(default)]
    pub current_url: String,
    /// Epoch milliseconds at which attribution to `current_url` started.
    pub session_start_time: i64,
}

impl SessionPointer {
    pub fn new(current_url: impl Into<String>, now_ms: i64) -> Self {
        Self {
            current_url: current_url.into(),
            session_start_time: now_ms,
        }
    }

    /// Returns true when there is no URL to attribute time to.
    pub fn is_empty(&self) -> bool {
        self.current_url.is_empty()
    }

    /// Milliseconds since attribution started, clamped at zero.
    pub const fn elapsed(&self, now_ms: i64) -> i64 {
        let elapsed = now_ms.saturating_sub(self.session_start_time);
        if elapsed < 0 { 0 } else { elapsed }
    }
}

/// Time committed by a single flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flush {
    /// Bucket the time went to.
    pub hostname: String,
    /// Milliseconds committed.
    pub elapsed_ms: i64,
}

/// The persisted state of the single active task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveState {
    pub task: Task,
    pub session_pointer: SessionPointer,
}

impl ActiveState {
    pub const fn new(task: Task, session_pointer: SessionPointer) -> Self {
        Self {
            task,
            session_pointer,
        }
    }

    /// Commits time elapsed since the session pointer was set.
    ///
    /// Returns `Ok(None)` when the pointer has no URL. The pointer itself is
    /// left untouched; callers decide whether to [`retarget`](Self::retarget).
    pub fn flush(&mut self, now_ms: i64) -> Result<Option<Flush>, UrlError> {
        if self.session_pointer.is_empty() {
            return Ok(None);
        }
        let hostname = extract_hostname(&self.session_pointer.current_url)?;
        let elapsed_ms = self.session_pointer.elapsed(now_ms);
        self.task.commit(&hostname, elapsed_ms);
        Ok(Some(Flush {
            hostname,
            elapsed_ms,
        }))
    }

    /// Points the session at `url`, starting attribution at `now_ms`.
    pub fn retarget(&mut self, url: impl Into<String>, now_ms: i64) {
        self.session_pointer = SessionPointer::new(url, now_ms);
    }

    /// Hostname and live delta that a flush at `now_ms` would commit.
    pub fn pending(&self, now_ms: i64) -> Option<Flush> {
        if self.session_pointer.is_empty() {
            return None;
        }
        let hostname = extract_hostname(&self.session_pointer.current_url).ok()?;
        Some(Flush {
            hostname,
            elapsed_ms: self.session_pointer.elapsed(now_ms),
        })
    }
}

//! Focus scoring and site-time summarization.
//!
//! Pure functions over a finished (or live-projected) [`Task`].
//!
//! # Score
//!
//! Starts at 100 and subtracts three capped penalties:
//! - tab switching: 5 points per switch-per-minute, capped at 30
//! - pausing: 5 points per pause, capped at 20
//! - site scatter: 2 points per site with time beyond the first, capped at 20

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::Task;

const MAX_SCORE: f64 = 100.0;
const MS_PER_MINUTE: f64 = 60_000.0;

const SWITCH_PENALTY_PER_RATE: f64 = 5.0;
const MAX_SWITCH_PENALTY: f64 = 30.0;

const PAUSE_PENALTY: f64 = 5.0;
const MAX_PAUSE_PENALTY: f64 = 20.0;

const SITE_PENALTY: f64 = 2.0;
const MAX_SITE_PENALTY: f64 = 20.0;

/// Buckets below this many milliseconds fold into [`OTHER_BUCKET`].
pub const SUMMARY_THRESHOLD_MS: i64 = 5 * 60_000;

/// Catch-all bucket name for short visits.
pub const OTHER_BUCKET: &str = "other";

/// Domain reported when no site time was recorded.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Computes the 0-100 focus score for a task.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "counts stay far below f64 precision and the result is clamped to 0..=100"
)]
pub fn calculate_focus_score(task: &Task) -> u8 {
    let minutes = (task.total_active_time as f64 / MS_PER_MINUTE).max(1.0);
    let switches_per_minute = f64::from(task.tab_switches) / minutes;
    let switch_penalty = (switches_per_minute * SWITCH_PENALTY_PER_RATE).min(MAX_SWITCH_PENALTY);

    let pause_penalty = (task.pause_count() as f64 * PAUSE_PENALTY).min(MAX_PAUSE_PENALTY);

    let extra_sites = task.site_count().saturating_sub(1);
    let site_penalty = (extra_sites as f64 * SITE_PENALTY).min(MAX_SITE_PENALTY);

    let score = MAX_SCORE - switch_penalty - pause_penalty - site_penalty;
    score.clamp(0.0, MAX_SCORE).round() as u8
}

/// Folds buckets shorter than [`SUMMARY_THRESHOLD_MS`] into [`OTHER_BUCKET`].
///
/// Applying the function to its own output returns the same map.
pub fn summarize_site_time(site_time: &BTreeMap<String, i64>) -> BTreeMap<String, i64> {
    let mut summary = BTreeMap::new();
    let mut other = 0;
    for (host, &ms) in site_time {
        if ms >= SUMMARY_THRESHOLD_MS {
            *summary.entry(host.clone()).or_insert(0) += ms;
        } else {
            other += ms;
        }
    }
    if other > 0 {
        *summary.entry(OTHER_BUCKET.to_string()).or_insert(0) += other;
    }
    summary
}

/// Hostname with the most committed time, or [`UNKNOWN_DOMAIN`].
///
/// Ties go to the lexicographically smallest hostname.
pub fn dominant_domain(site_time: &BTreeMap<String, i64>) -> String {
    site_time
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map_or_else(|| UNKNOWN_DOMAIN.to_string(), |(host, _)| host.clone())
}

/// Coarse focus band, used for badges and status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusLevel {
    High,
    Medium,
    Low,
}

impl FocusLevel {
    pub const fn from_score(score: u8) -> Self {
        match score {
            70..=u8::MAX => Self::High,
            40..=69 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Badge color as a hex string.
    pub const fn color(&self) -> &'static str {
        match self {
            Self::High => "#22c55e",
            Self::Medium => "#eab308",
            Self::Low => "#ef4444",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for FocusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

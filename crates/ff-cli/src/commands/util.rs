//! Shared utilities for CLI commands.

use chrono::{DateTime, Utc};

/// Formats milliseconds as `1h 05m`, `4m 30s` or `42s`.
pub fn format_duration(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1_000;
    let hours = total_seconds / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    if hours >= 1 {
        format!("{hours}h {minutes:02}m")
    } else if minutes >= 1 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

/// Formats epoch milliseconds as `2026-01-15 10:30 UTC`.
pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

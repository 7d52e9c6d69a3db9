//! Tab event normalization.
//!
//! Hosts report raw tab events; only activations and completed navigations of
//! the active tab count as "the foreground URL changed". Repeated identical
//! URLs are forwarded as-is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Loading status reported with a tab update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    #[default]
    Complete,
}

impl TabStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for TabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loading" => Ok(Self::Loading),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("invalid tab status: {s}")),
        }
    }
}

/// A raw tab event from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TabEvent {
    /// A different tab became active.
    Activated { url: String },
    /// A tab's navigation state changed.
    Updated {
        url: String,
        #[serde(default)]
        status: TabStatus,
        #[serde(default = "default_active")]
        active: bool,
    },
}

const fn default_active() -> bool {
    true
}

impl TabEvent {
    /// The new foreground URL, if this event changes it.
    pub fn active_url(&self) -> Option<&str> {
        match self {
            Self::Activated { url } => Some(url),
            Self::Updated {
                url,
                status: TabStatus::Complete,
                active: true,
            } => Some(url),
            Self::Updated { .. } => None,
        }
    }
}

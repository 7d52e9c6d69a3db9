//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Base URL of the activity backend.
    pub api_url: String,
    /// Post task summaries when a task ends.
    pub sync_enabled: bool,
    /// Delivery attempts per summary. 1 means at-most-once.
    pub sync_attempts: u32,
    /// Per-request timeout in seconds.
    pub sync_timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("api_url", &self.api_url)
            .field("sync_enabled", &self.sync_enabled)
            .field("sync_attempts", &self.sync_attempts)
            .field("sync_timeout_secs", &self.sync_timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("ff.db"),
            api_url: "http://localhost:8000".to_string(),
            sync_enabled: true,
            sync_attempts: 1,
            sync_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // FF_DATABASE_PATH, FF_API_URL, ...
        figment = figment.merge(Env::prefixed("FF_"));

        figment.extract()
    }

    pub const fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }
}

/// Returns the platform-specific config directory for ff.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ff"))
}

/// Returns the platform-specific data directory for ff.
///
/// On Linux: `~/.local/share/ff`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ff"))
}

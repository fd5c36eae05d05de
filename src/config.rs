//! Runtime configuration.
//!
//! Values come from an optional TOML file and are then overridden by
//! command-line flags / environment variables (see `main.rs`).  The bearer
//! token is never read from or written to the file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::source::DEFAULT_API_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Bearer token, supplied by the caller (normally `GITHUB_TOKEN`).
    #[serde(skip)]
    pub token: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Baseline delay between polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound for the backed-off delay.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Bound on a single request to the remote source.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Capacity of the presentation event queue.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            poll_interval_secs: default_poll_interval_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_backoff_secs() -> u64 {
    900
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_event_buffer() -> usize {
    64
}

impl SyncConfig {
    /// Load configuration from `path`.  A missing file yields defaults; a
    /// file that exists but does not parse is an error.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject configurations the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::Config(
                "no GitHub token (set GITHUB_TOKEN or pass --token)".into(),
            ));
        }
        if self.api_url.trim().is_empty() {
            return Err(Error::Config("api_url is empty".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Config("poll_interval_secs must be > 0".into()));
        }
        if self.max_backoff_secs < self.poll_interval_secs {
            return Err(Error::Config(format!(
                "max_backoff_secs ({}) must be >= poll_interval_secs ({})",
                self.max_backoff_secs, self.poll_interval_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be > 0".into()));
        }
        if self.event_buffer == 0 {
            return Err(Error::Config("event_buffer must be > 0".into()));
        }
        Ok(())
    }
}

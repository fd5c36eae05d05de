//! Error types for the synchronizer.
//!
//! Only two kinds of failure cross module boundaries: a [`Error::Config`]
//! problem, which is fatal and never retried, and a [`FetchError`], which the
//! poll scheduler answers with backoff.  Reconciliation has no error path.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (e.g. an empty token).
    #[error("configuration error: {0}")]
    Config(String),

    /// A single fetch of the notification list failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The presentation layer dropped its end of the event stream.
    #[error("event channel closed")]
    EventChannelClosed,
}

/// Why one request to the remote notification source failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with something other than 200 or 304.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    /// Connection, TLS, or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The body was not a JSON array of notifications.
    #[error("malformed response body: {0}")]
    Parse(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl FetchError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }

    /// One-line description suitable for a tooltip or status bar.
    pub fn summary(&self) -> String {
        match self {
            FetchError::Status { status: 401 } => "GitHub rejected the token (401)".to_string(),
            FetchError::Status { status: 403 } => {
                "GitHub refused the request (403), possibly rate limited".to_string()
            }
            FetchError::Status { status } => format!("GitHub returned HTTP {status}"),
            FetchError::Transport(msg) => format!("network error: {msg}"),
            FetchError::Parse(_) => "could not parse GitHub response".to_string(),
            FetchError::Timeout(d) => format!("request timed out after {}s", d.as_secs()),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

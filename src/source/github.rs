//! GitHub notifications source.
//!
//! Issues `GET /notifications` with the headers GitHub's REST API expects
//! and turns the response into a [`FetchOutcome`].  Status handling:
//!
//! | status | outcome                         |
//! |--------|---------------------------------|
//! | 200    | `FetchOutcome::Updated(list)`   |
//! | 304    | `FetchOutcome::NotModified`     |
//! | other  | `FetchError::Status { status }` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use tracing::debug;

use super::{FetchOutcome, Notification, NotificationSource};
use crate::error::{Error, FetchError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com/notifications";

/// Value sent in the `X-GitHub-Api-Version` header.
pub const API_VERSION: &str = "2022-11-28";

const ACCEPT_V3: &str = "application/vnd.github.v3+json";

/// A GitHub notifications endpoint.
pub struct GitHubSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl GitHubSource {
    /// Create a source for `url` whose requests give up after `timeout`.
    ///
    /// The timeout is applied by the HTTP client itself; the scheduler
    /// enforces the same bound independently so scripted sources are
    /// covered too.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    /// Parse a response body into notifications.
    ///
    /// Pure function (no I/O) so the decoding rules can be tested without a
    /// server.  Either the whole array decodes or nothing is returned.
    pub fn parse_body(body: &[u8]) -> std::result::Result<Vec<Notification>, FetchError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl NotificationSource for GitHubSource {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch(&self, token: &str) -> Result<FetchOutcome> {
        if token.trim().is_empty() {
            return Err(Error::Config("GitHub token is empty".into()));
        }

        let resp = self
            .client
            .get(&self.url)
            .header(ACCEPT, ACCEPT_V3)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(USER_AGENT, concat!("ghnotify-sync/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        debug!(%status, url = %self.url, "notifications response");

        match status {
            StatusCode::NOT_MODIFIED => Ok(FetchOutcome::NotModified),
            StatusCode::OK => {
                let body = resp.bytes().await.map_err(|e| self.classify(e))?;
                let list = Self::parse_body(&body)?;
                Ok(FetchOutcome::Updated(list))
            }
            other => Err(FetchError::Status {
                status: other.as_u16(),
            }
            .into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

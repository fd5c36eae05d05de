//! Remote notification source abstraction.
//!
//! This module defines the [`NotificationSource`] trait and the
//! [`Notification`] type.  The only production implementation is
//! [`GitHubSource`]; tests plug in scripted sources through the same trait.
//!
//! A source is stateless: every call to [`fetch`](NotificationSource::fetch)
//! is one request/response with no retries.  Backoff lives in [`crate::poll`].

mod github;
mod notification;

pub use github::{GitHubSource, API_VERSION, DEFAULT_API_URL};
pub use notification::{Notification, Owner, Repository, Subject};

#[cfg(test)]
pub(crate) use notification::tests::{at, make_notification};

use async_trait::async_trait;

use crate::error::Result;

/// Result of one successful request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// HTTP 200: the full current list.
    Updated(Vec<Notification>),
    /// HTTP 304: nothing changed since the previous request.
    NotModified,
}

/// Trait that every notification source must implement.
///
/// The poll scheduler calls [`fetch()`](NotificationSource::fetch) from a
/// background task, so implementations must be [`Send`] + [`Sync`].
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Human-readable label used in logs.
    fn name(&self) -> &str;

    /// Fetch the current notification list using `token` as bearer
    /// credential.
    ///
    /// An empty token is an [`Error::Config`](crate::Error::Config) and must
    /// be rejected before any I/O.  Every other failure is an
    /// [`Error::Fetch`](crate::Error::Fetch).
    async fn fetch(&self, token: &str) -> Result<FetchOutcome>;
}

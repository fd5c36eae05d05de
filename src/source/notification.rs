//! The notification type shared by the client, the store and the bridge.
//!
//! Mirrors the JSON objects returned by `GET /notifications`.  Only `id`,
//! `unread`, `updated_at` and the embedded subject/repository descriptors are
//! required; everything else tolerates being absent or `null`.
//!
//! ## Sorting
//!
//! [`Notification::newest_first`] orders by `updated_at` descending, with the
//! id as a tie-breaker so the order is total and stable.  There is no `Ord`
//! impl: equality covers every field, the ordering only two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single remote notification thread.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Opaque thread id, stable across polls.
    pub id: String,

    /// Remote read state.
    pub unread: bool,

    /// Why the user was notified (`mention`, `review_requested`, ...).
    /// Kept as a free-form string; new reasons appear without notice.
    #[serde(default)]
    pub reason: String,

    /// Last remote change, used for ordering.
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub last_read_at: Option<DateTime<Utc>>,

    pub subject: Subject,

    pub repository: Repository,

    /// API URL of the thread itself.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub subscription_url: String,
}

/// What the notification is about.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub title: String,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub latest_comment_url: Option<String>,

    /// `Issue`, `PullRequest`, `Commit`, `Release`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,

    #[serde(default)]
    pub node_id: String,

    #[serde(default)]
    pub name: String,

    pub full_name: String,

    #[serde(default)]
    pub private: bool,

    pub owner: Owner,

    #[serde(default)]
    pub html_url: String,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,

    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub node_id: String,

    #[serde(default)]
    pub avatar_url: String,

    #[serde(default)]
    pub html_url: String,

    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub site_admin: bool,
}

impl Notification {
    /// True when `other` differs in a field the store tracks for change
    /// detection (`unread` or `updated_at`).
    pub fn differs_from(&self, other: &Notification) -> bool {
        self.unread != other.unread || self.updated_at != other.updated_at
    }

    /// Comparator for `sort_by`: newer `updated_at` first, then by id.
    pub fn newest_first(a: &Notification, b: &Notification) -> Ordering {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Shorthand constructor for tests.
    pub fn make_notification(id: &str, unread: bool, updated_at: DateTime<Utc>) -> Notification {
        Notification {
            id: id.to_string(),
            unread,
            reason: "subscribed".to_string(),
            updated_at,
            last_read_at: None,
            subject: Subject {
                title: format!("Thread {id}"),
                url: Some(format!("https://api.github.com/repos/octo/hello/issues/{id}")),
                latest_comment_url: None,
                kind: "Issue".to_string(),
            },
            repository: Repository {
                id: 1296269,
                node_id: "MDEwOlJlcG9zaXRvcnkxMjk2MjY5".to_string(),
                name: "hello".to_string(),
                full_name: "octo/hello".to_string(),
                private: false,
                owner: Owner {
                    login: "octo".to_string(),
                    id: 1,
                    node_id: String::new(),
                    avatar_url: String::new(),
                    html_url: String::new(),
                    kind: "User".to_string(),
                    site_admin: false,
                },
                html_url: "https://github.com/octo/hello".to_string(),
                description: None,
            },
            url: format!("https://api.github.com/notifications/threads/{id}"),
            subscription_url: String::new(),
        }
    }

    pub fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn sort_reverse_chronological() {
        let old = make_notification("1", true, at(1));
        let mid = make_notification("2", true, at(2));
        let new = make_notification("3", true, at(3));

        let mut items = vec![old, new, mid];
        items.sort_by(Notification::newest_first);

        assert_eq!(items[0].id, "3", "newest first");
        assert_eq!(items[1].id, "2");
        assert_eq!(items[2].id, "1", "oldest last");
    }

    #[test]
    fn same_timestamp_orders_by_id() {
        let a = make_notification("a", true, at(5));
        let b = make_notification("b", true, at(5));
        assert_eq!(Notification::newest_first(&a, &b), Ordering::Less);
        assert_eq!(Notification::newest_first(&b, &a), Ordering::Greater);
    }

    #[test]
    fn equal_ordering_key_does_not_imply_equal_values() {
        let a = make_notification("a", true, at(5));
        let mut retitled = a.clone();
        retitled.subject.title = "renamed".into();

        assert_eq!(Notification::newest_first(&a, &retitled), Ordering::Equal);
        assert_ne!(a, retitled);
    }

    #[test]
    fn differs_from_tracks_unread_and_updated_at_only() {
        let base = make_notification("1", true, at(1));

        let mut retitled = base.clone();
        retitled.subject.title = "renamed".into();
        assert!(!base.differs_from(&retitled));

        let mut read = base.clone();
        read.unread = false;
        assert!(base.differs_from(&read));

        let bumped = make_notification("1", true, at(2));
        assert!(base.differs_from(&bumped));
    }

    #[test]
    fn deserializes_github_payload() {
        let json = r#"{
            "id": "1",
            "repository": {
                "id": 1296269,
                "node_id": "MDEwOlJlcG9zaXRvcnkxMjk2MjY5",
                "name": "Hello-World",
                "full_name": "octocat/Hello-World",
                "owner": {
                    "login": "octocat",
                    "id": 1,
                    "type": "User",
                    "site_admin": false
                },
                "private": false,
                "html_url": "https://github.com/octocat/Hello-World",
                "description": null
            },
            "subject": {
                "title": "Greetings",
                "url": "https://api.github.com/repos/octokit/octokit.rb/issues/123",
                "latest_comment_url": null,
                "type": "Issue"
            },
            "reason": "subscribed",
            "unread": true,
            "updated_at": "2014-11-07T22:01:45Z",
            "last_read_at": "2014-11-07T22:01:45Z",
            "url": "https://api.github.com/notifications/threads/1",
            "subscription_url": "https://api.github.com/notifications/threads/1/subscription"
        }"#;

        let n: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(n.id, "1");
        assert!(n.unread);
        assert_eq!(n.subject.kind, "Issue");
        assert!(n.subject.latest_comment_url.is_none());
        assert_eq!(n.repository.owner.login, "octocat");
        assert!(n.last_read_at.is_some());
        assert_eq!(n.updated_at, Utc.with_ymd_and_hms(2014, 11, 7, 22, 1, 45).unwrap());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let json = r#"{"id": "1", "unread": true}"#;
        assert!(serde_json::from_str::<Notification>(json).is_err());
    }
}

//! Notification state store.
//!
//! Holds the last-known [`Snapshot`] and reconciles each fetched list against
//! it.  The snapshot is immutable once published: every write builds a new
//! one and swaps the [`Arc`], so a reader that grabbed a snapshot keeps a
//! consistent view no matter how many polls happen afterwards.
//!
//! Local dismissals live inside the snapshot so the unread count is always
//! computed from one coherent pair of (notifications, dismissals).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::source::Notification;

/// Notifications as of the most recent successful poll.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    notifications: HashMap<String, Notification>,
    /// Ids the user dismissed locally that the remote still reports unread.
    dismissed: HashSet<String>,
}

/// Classification of one poll against the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    /// Present before and after, with `unread` or `updated_at` differing.
    pub changed: BTreeSet<String>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.notifications.get(id)
    }

    pub fn is_dismissed(&self, id: &str) -> bool {
        self.dismissed.contains(id)
    }

    /// Unread entries that have not been dismissed locally.
    pub fn unread_count(&self) -> usize {
        self.notifications
            .values()
            .filter(|n| n.unread && !self.dismissed.contains(&n.id))
            .count()
    }

    /// All notifications, newest `updated_at` first.
    pub fn sorted(&self) -> Vec<Notification> {
        let mut items: Vec<Notification> = self.notifications.values().cloned().collect();
        items.sort_by(Notification::newest_first);
        items
    }

    /// Build the snapshot that follows `self` when the remote reports
    /// `incoming`, along with the delta between the two.
    ///
    /// Incoming entries replace stored ones wholesale.  If the same id
    /// appears twice in `incoming`, the later entry wins.
    pub fn reconcile(&self, incoming: Vec<Notification>) -> (Snapshot, Delta) {
        let mut next: HashMap<String, Notification> = HashMap::with_capacity(incoming.len());
        for n in incoming {
            next.insert(n.id.clone(), n);
        }

        let mut delta = Delta::default();
        for (id, n) in &next {
            match self.notifications.get(id) {
                None => {
                    delta.added.insert(id.clone());
                }
                Some(prev) if prev.differs_from(n) => {
                    delta.changed.insert(id.clone());
                }
                Some(_) => {}
            }
        }
        for id in self.notifications.keys() {
            if !next.contains_key(id) {
                delta.removed.insert(id.clone());
            }
        }

        // A dismissal only survives while the remote still says "unread".
        let dismissed = self
            .dismissed
            .iter()
            .filter(|id| next.get(*id).is_some_and(|n| n.unread))
            .cloned()
            .collect();

        let snapshot = Snapshot {
            notifications: next,
            dismissed,
        };
        (snapshot, delta)
    }

    fn with_dismissed(&self, id: &str) -> Snapshot {
        let mut next = self.clone();
        next.dismissed.insert(id.to_string());
        next
    }
}

/// Owner of the current [`Snapshot`].
///
/// The poll scheduler is the only caller of [`reconcile`](Self::reconcile);
/// any number of readers may query concurrently.  Writers build the next
/// snapshot outside `current`'s lock and take it only for the swap, so
/// readers never wait on a reconcile.
#[derive(Debug, Default)]
pub struct NotificationStore {
    current: RwLock<Arc<Snapshot>>,
    /// Serialises read-modify-write cycles so a dismissal and a reconcile
    /// cannot both start from the same snapshot.
    writer: Mutex<()>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot.  The lock is held only long enough to clone
    /// the `Arc`.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the snapshot with one built from `incoming` and return what
    /// changed.
    pub fn reconcile(&self, incoming: Vec<Notification>) -> Delta {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let (next, delta) = self.snapshot().reconcile(incoming);
        self.swap(next);
        delta
    }

    pub fn unread_count(&self) -> usize {
        self.snapshot().unread_count()
    }

    /// Notifications sorted by `updated_at` descending, for the popup list.
    pub fn list_notifications(&self) -> Vec<Notification> {
        self.snapshot().sorted()
    }

    /// Hide `id` from the unread count until the remote catches up.
    ///
    /// Returns `false` (and changes nothing) when `id` is unknown, already
    /// read, or already dismissed.
    pub fn mark_dismissed(&self, id: &str) -> bool {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        let eligible = current.get(id).is_some_and(|n| n.unread) && !current.is_dismissed(id);
        if eligible {
            self.swap(current.with_dismissed(id));
        }
        eligible
    }

    fn swap(&self, next: Snapshot) {
        let next = Arc::new(next);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

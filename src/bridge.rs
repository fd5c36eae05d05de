//! Presentation bridge.
//!
//! Turns store deltas and poll failures into a small ordered stream of
//! [`PresentationEvent`]s for the UI, and routes UI-originated
//! [`UiSignal`]s back to the store and the scheduler.
//!
//! ```text
//! Scheduler ── Delta / FetchError ──► Bridge ── PresentationEvent ──► UI
//!     ▲                                 │  ▲
//!     └──────── refresh request ────────┘  └──────── UiSignal ─────── UI
//! ```
//!
//! The event queue is a bounded [`mpsc`] channel: when the UI falls behind,
//! publishers wait instead of dropping events.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::error::{Error, FetchError, Result};
use crate::poll::PollControl;
use crate::source::Notification;
use crate::store::{Delta, NotificationStore};

/// Events delivered to the presentation layer, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    /// The unread badge should now show this count.
    BadgeChanged(usize),
    /// An unread notification appeared that was not in the previous snapshot.
    NewNotificationArrived(Notification),
    /// A poll failed.  `consecutive_failures` lets the UI decide when a
    /// persistent warning is warranted.
    FetchFailed {
        summary: String,
        consecutive_failures: u32,
    },
}

/// Signals coming from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiSignal {
    ManualRefreshRequested,
    WindowLostFocus,
    EscapePressed,
    MarkDismissed(String),
}

/// What the bridge did with a [`UiSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The popup should be hidden.
    HideWindow,
    /// A poll will start right away.
    RefreshQueued,
    /// A poll is already running or queued; nothing to do.
    RefreshIgnored,
    /// `changed` is false when the id was unknown, read, or already dismissed.
    Dismissed { changed: bool },
}

/// Receiving half of the event queue.  There is exactly one consumer.
pub struct EventStream {
    rx: mpsc::Receiver<PresentationEvent>,
}

impl EventStream {
    /// Next event, or `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<PresentationEvent> {
        self.rx.recv().await
    }

    /// Non-blocking variant for UIs that drain on a tick.
    pub fn try_recv(&mut self) -> Option<PresentationEvent> {
        self.rx.try_recv().ok()
    }
}

pub struct PresentationBridge {
    store: Arc<NotificationStore>,
    control: PollControl,
    tx: mpsc::Sender<PresentationEvent>,
    /// Last count sent as `BadgeChanged`.  Held across the sends of one
    /// publish so events from different publishers never interleave.
    last_badge: Mutex<usize>,
}

impl PresentationBridge {
    /// Create a bridge and the matching event stream.  The badge is assumed
    /// to start at zero, so an initial empty poll emits nothing.
    pub fn new(
        store: Arc<NotificationStore>,
        control: PollControl,
        capacity: usize,
    ) -> (Self, EventStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let bridge = Self {
            store,
            control,
            tx,
            last_badge: Mutex::new(0),
        };
        (bridge, EventStream { rx })
    }

    /// Publish the consequences of one reconcile.
    ///
    /// Emits `BadgeChanged` first (if the count moved), then one
    /// `NewNotificationArrived` per added unread id, oldest first.
    pub async fn publish_delta(&self, delta: &Delta) -> Result<()> {
        let snapshot = self.store.snapshot();
        let mut last_badge = self.last_badge.lock().await;

        let count = snapshot.unread_count();
        if count != *last_badge {
            self.send(PresentationEvent::BadgeChanged(count)).await?;
            *last_badge = count;
        }

        let mut arrived: Vec<&Notification> = delta
            .added
            .iter()
            .filter_map(|id| snapshot.get(id))
            .filter(|n| n.unread)
            .collect();
        arrived.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));

        for n in arrived {
            debug!(id = %n.id, title = %n.subject.title, "new notification");
            self.send(PresentationEvent::NewNotificationArrived(n.clone()))
                .await?;
        }
        Ok(())
    }

    pub async fn publish_failure(&self, err: &FetchError, consecutive_failures: u32) -> Result<()> {
        // Serialise with publish_delta so ordering holds across publishers.
        let _guard = self.last_badge.lock().await;
        self.send(PresentationEvent::FetchFailed {
            summary: err.summary(),
            consecutive_failures,
        })
        .await
    }

    /// Apply a UI signal.
    pub async fn handle_signal(&self, signal: UiSignal) -> Result<SignalOutcome> {
        match signal {
            UiSignal::WindowLostFocus | UiSignal::EscapePressed => {
                debug!(?signal, "hiding popup");
                Ok(SignalOutcome::HideWindow)
            }
            UiSignal::ManualRefreshRequested => {
                if self.control.request_refresh() {
                    info!("manual refresh requested");
                    Ok(SignalOutcome::RefreshQueued)
                } else {
                    debug!("manual refresh ignored, poll already in flight");
                    Ok(SignalOutcome::RefreshIgnored)
                }
            }
            UiSignal::MarkDismissed(id) => {
                let changed = self.store.mark_dismissed(&id);
                if changed {
                    debug!(%id, "dismissed locally");
                    self.refresh_badge().await?;
                }
                Ok(SignalOutcome::Dismissed { changed })
            }
        }
    }

    pub fn unread_count(&self) -> usize {
        self.store.unread_count()
    }

    /// Notifications for the popup list, newest first.
    pub fn list_notifications(&self) -> Vec<Notification> {
        self.store.list_notifications()
    }

    async fn refresh_badge(&self) -> Result<()> {
        let mut last_badge = self.last_badge.lock().await;
        let count = self.store.unread_count();
        if count != *last_badge {
            self.send(PresentationEvent::BadgeChanged(count)).await?;
            *last_badge = count;
        }
        Ok(())
    }

    async fn send(&self, event: PresentationEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| Error::EventChannelClosed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! ghnotify-sync: the polling and state engine behind a GitHub notification
//! tray badge.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐ fetch  ┌──────────┐ Delta ┌──────────┐ PresentationEvent ┌────┐
//! │ poll.rs  │ ─────► │ store.rs │ ────► │bridge.rs │ ────────────────► │ UI │
//! │  (task)  │        │(snapshot)│       │          │ ◄──────────────── │    │
//! └──────────┘        └──────────┘       └──────────┘      UiSignal     └────┘
//!      │ ▲                                     │
//!      ▼ └──────── manual refresh ─────────────┘
//! ┌──────────┐
//! │ source/  │  GitHub REST client
//! └──────────┘
//! ```
//!
//! * **`source/`** — the `NotificationSource` trait, the `Notification` type,
//!   and the GitHub implementation.
//! * **`store`** — owns the current snapshot, reconciles fetches into deltas,
//!   tracks local dismissals.
//! * **`poll`** — the cancellable scheduler loop with backoff.
//! * **`bridge`** — maps deltas and failures to UI events, routes UI signals.
//! * **`config`** / **`logging`** / **`error`** — ambient plumbing.

pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod poll;
pub mod source;
pub mod store;

pub use bridge::{EventStream, PresentationBridge, PresentationEvent, SignalOutcome, UiSignal};
pub use config::SyncConfig;
pub use error::{Error, FetchError, Result};
pub use poll::{
    control_channel, PollControl, PollPhase, PollState, PollTriggers, Scheduler, Timer, TokioTimer,
};
pub use source::{FetchOutcome, GitHubSource, Notification, NotificationSource};
pub use store::{Delta, NotificationStore, Snapshot};

//! Background notification polling.
//!
//! A single tokio task runs the [`Scheduler`] loop:
//!
//! ```text
//!           ┌──────────── interval elapsed / manual refresh ─────────────┐
//!           ▼                                                            │
//!  ──►  Polling ── fetch ok ──► reconcile + publish ──►  Idle  ──────────┘
//!           │                                             ▲
//!           └──── fetch failed ──► backoff + publish ─────┘
//!
//!  cancel (from any state) ──► Stopped
//! ```
//!
//! The task is the only writer of [`PollState`] and the only caller of
//! [`NotificationStore::reconcile`], so reconciles never overlap.  Waiting is
//! done through an injectable [`Timer`] so tests can drive backoff without
//! real delays.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bridge::PresentationBridge;
use crate::config::SyncConfig;
use crate::error::{Error, FetchError, Result};
use crate::source::{FetchOutcome, NotificationSource};
use crate::store::{Delta, NotificationStore};

/// Where the scheduler loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Polling,
    Stopped,
}

/// Scheduler bookkeeping.  Lives for the process; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// Delay before the next poll.
    pub current_interval: Duration,
}

impl PollState {
    pub fn new(baseline: Duration) -> Self {
        Self {
            last_success_at: None,
            consecutive_failures: 0,
            current_interval: baseline,
        }
    }

    fn record_success(&mut self, now: DateTime<Utc>, baseline: Duration) {
        self.last_success_at = Some(now);
        self.consecutive_failures = 0;
        self.current_interval = baseline;
    }

    fn record_failure(&mut self, baseline: Duration, max: Duration) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.current_interval = backoff_interval(baseline, max, self.consecutive_failures);
    }
}

/// Delay after `failures` consecutive failures: the baseline for the first
/// failure, doubling for each further one, never above `max`.
pub fn backoff_interval(baseline: Duration, max: Duration, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(31);
    baseline
        .checked_mul(1u32 << exponent)
        .map_or(max, |d| d.min(max))
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// Clock and sleep used by the scheduler.
#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);

    fn now(&self) -> DateTime<Utc>;
}

/// Real time, via tokio.
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ---------------------------------------------------------------------------
// Control handles
// ---------------------------------------------------------------------------

/// Cloneable handle used by the UI side to steer the scheduler.
#[derive(Clone)]
pub struct PollControl {
    refresh_tx: mpsc::Sender<()>,
    phase: watch::Receiver<PollPhase>,
    cancel: CancellationToken,
}

/// Scheduler-side ends of the control channels.
pub struct PollTriggers {
    refresh_rx: mpsc::Receiver<()>,
    phase: watch::Sender<PollPhase>,
    cancel: CancellationToken,
}

/// Create a connected [`PollControl`] / [`PollTriggers`] pair.
pub fn control_channel() -> (PollControl, PollTriggers) {
    // Capacity 1: at most one refresh can be pending.
    let (refresh_tx, refresh_rx) = mpsc::channel(1);
    // The first poll starts as soon as the scheduler runs.
    let (phase_tx, phase_rx) = watch::channel(PollPhase::Polling);
    let cancel = CancellationToken::new();

    let control = PollControl {
        refresh_tx,
        phase: phase_rx,
        cancel: cancel.clone(),
    };
    let triggers = PollTriggers {
        refresh_rx,
        phase: phase_tx,
        cancel,
    };
    (control, triggers)
}

impl PollControl {
    /// Ask for an immediate poll.  Returns `false` when a poll is already in
    /// flight, one is already pending, or the scheduler has stopped.
    pub fn request_refresh(&self) -> bool {
        if *self.phase.borrow() != PollPhase::Idle {
            return false;
        }
        self.refresh_tx.try_send(()).is_ok()
    }

    pub fn phase(&self) -> PollPhase {
        *self.phase.borrow()
    }

    /// Wait until the scheduler reaches `phase`.  Returns immediately if it
    /// is already there.
    pub async fn wait_for_phase(&self, phase: PollPhase) {
        let mut rx = self.phase.clone();
        // Err means the scheduler is gone; there is nothing left to wait for.
        let _ = rx.wait_for(|p| *p == phase).await;
    }

    /// Stop the scheduler.  An in-flight fetch finishes, but its result is
    /// discarded.  Events of the current poll still waiting for queue space
    /// are dropped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl PollTriggers {
    pub(crate) fn set_phase(&self, phase: PollPhase) {
        self.phase.send_replace(phase);
    }

    /// Throw away refresh requests that arrived while polling.
    fn drain_refresh(&mut self) {
        while self.refresh_rx.try_recv().is_ok() {}
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

enum Step {
    Continue,
    Stop,
}

/// What one poll has to tell the presentation layer.
enum Publish {
    Delta(Delta),
    Failure(FetchError),
}

pub struct Scheduler {
    token: String,
    baseline: Duration,
    max_backoff: Duration,
    request_timeout: Duration,
    source: Arc<dyn NotificationSource>,
    store: Arc<NotificationStore>,
    bridge: Arc<PresentationBridge>,
    timer: Arc<dyn Timer>,
    triggers: PollTriggers,
    state: PollState,
}

impl Scheduler {
    /// Build a scheduler.  Fails with [`Error::Config`] if `config` does not
    /// validate; nothing is fetched in that case.
    pub fn new(
        config: &SyncConfig,
        source: Arc<dyn NotificationSource>,
        store: Arc<NotificationStore>,
        bridge: Arc<PresentationBridge>,
        triggers: PollTriggers,
        timer: Arc<dyn Timer>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            token: config.token.clone(),
            baseline: config.poll_interval(),
            max_backoff: config.max_backoff(),
            request_timeout: config.request_timeout(),
            source,
            store,
            bridge,
            timer,
            triggers,
            state: PollState::new(config.poll_interval()),
        })
    }

    /// Run the loop on a new tokio task.  The handle resolves to the final
    /// [`PollState`] once the scheduler stops.
    pub fn spawn(self) -> JoinHandle<PollState> {
        tokio::spawn(self.run())
    }

    /// Poll immediately, then keep polling until cancelled.
    pub async fn run(mut self) -> PollState {
        info!(
            source = self.source.name(),
            interval_secs = self.baseline.as_secs(),
            "poll scheduler started"
        );

        loop {
            if self.triggers.cancel.is_cancelled() {
                break;
            }

            self.triggers.set_phase(PollPhase::Polling);
            if let Step::Stop = self.poll_once().await {
                break;
            }

            self.triggers.drain_refresh();
            self.triggers.set_phase(PollPhase::Idle);

            let wait = self.state.current_interval;
            debug!(wait_secs = wait.as_secs(), "waiting for next poll");

            let cancel = self.triggers.cancel.clone();
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(()) = self.triggers.refresh_rx.recv() => {
                    debug!("manual refresh, skipping remaining wait");
                }
                () = self.timer.sleep(wait) => {}
            }
        }

        self.triggers.set_phase(PollPhase::Stopped);
        info!(
            failures = self.state.consecutive_failures,
            "poll scheduler stopped"
        );
        self.state
    }

    async fn poll_once(&mut self) -> Step {
        let result = match tokio::time::timeout(
            self.request_timeout,
            self.source.fetch(&self.token),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.request_timeout).into()),
        };

        if self.triggers.cancel.is_cancelled() {
            debug!("cancelled during fetch, discarding result");
            return Step::Stop;
        }

        let publish = match result {
            Ok(FetchOutcome::Updated(list)) => {
                self.state.record_success(self.timer.now(), self.baseline);
                let fetched = list.len();
                let delta = self.store.reconcile(list);
                info!(
                    fetched,
                    added = delta.added.len(),
                    changed = delta.changed.len(),
                    removed = delta.removed.len(),
                    "notifications reconciled"
                );
                Publish::Delta(delta)
            }
            Ok(FetchOutcome::NotModified) => {
                self.state.record_success(self.timer.now(), self.baseline);
                debug!("notifications not modified");
                return Step::Continue;
            }
            Err(Error::Fetch(err)) => {
                self.state.record_failure(self.baseline, self.max_backoff);
                warn!(
                    error = %err,
                    status = err.status(),
                    timed_out = err.is_timeout(),
                    failures = self.state.consecutive_failures,
                    next_in_secs = self.state.current_interval.as_secs(),
                    "poll failed, backing off"
                );
                Publish::Failure(err)
            }
            Err(err) => {
                error!(error = %err, "poll aborted");
                return Step::Stop;
            }
        };

        let bridge = &self.bridge;
        let failures = self.state.consecutive_failures;
        let published = async {
            match &publish {
                Publish::Delta(delta) => bridge.publish_delta(delta).await,
                Publish::Failure(err) => bridge.publish_failure(err, failures).await,
            }
        };

        // A full event queue must not keep the scheduler from stopping.
        tokio::select! {
            biased;
            () = self.triggers.cancel.cancelled() => {
                debug!("cancelled while publishing, dropping remaining events");
                Step::Stop
            }
            result = published => match result {
                Ok(()) => Step::Continue,
                // If the receiver is gone the UI has exited; stop polling.
                Err(err) => {
                    info!(error = %err, "presentation layer gone");
                    Step::Stop
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

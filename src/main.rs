//! ghnotify — keep a GitHub notification badge in sync.
//!
//! Runs the polling engine headless: presentation events are logged, and
//! stdin lines stand in for tray/popup interactions (see [`input`]).
//!
//! * **`input`** — maps typed commands to UI signals.
//! * **`main`** — wires everything together: parse args, load config, spawn
//!   the scheduler, and run the event loop until Ctrl-C or `quit`.

mod input;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ghnotify_sync::{
    control_channel, logging, GitHubSource, NotificationStore, PollPhase, PresentationBridge,
    PresentationEvent, Scheduler, SyncConfig, TokioTimer,
};

/// Poll GitHub notifications and maintain an unread badge.
#[derive(Parser, Debug)]
#[command(name = "ghnotify")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// GitHub token used as bearer credential
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// TOML config file (missing file means defaults)
    #[arg(short, long, env = "GHNOTIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Baseline poll interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Maximum backed-off poll interval in seconds
    #[arg(long)]
    max_backoff: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Notifications endpoint
    #[arg(long)]
    api_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// File values first, then CLI/env overrides.
    fn into_config(self) -> Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => SyncConfig::load_from_path(path)?,
            None => SyncConfig::default(),
        };

        config.token = self.token.unwrap_or_default();
        if let Some(secs) = self.interval {
            config.poll_interval_secs = secs;
        }
        if let Some(secs) = self.max_backoff {
            config.max_backoff_secs = secs;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = secs;
        }
        if let Some(url) = self.api_url {
            config.api_url = url;
        }

        config.validate()?;
        Ok(config)
    }
}

fn present(event: &PresentationEvent) {
    match event {
        PresentationEvent::BadgeChanged(count) => info!(count, "badge"),
        PresentationEvent::NewNotificationArrived(n) => info!(
            id = %n.id,
            repo = %n.repository.full_name,
            reason = %n.reason,
            "{}",
            n.subject.title
        ),
        PresentationEvent::FetchFailed {
            summary,
            consecutive_failures,
        } => warn!(failures = consecutive_failures, "{summary}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    let config = cli.into_config().context("invalid configuration")?;

    // -- wire up the engine --------------------------------------------------
    let store = Arc::new(NotificationStore::new());
    let (control, triggers) = control_channel();
    let (bridge, mut events) =
        PresentationBridge::new(Arc::clone(&store), control.clone(), config.event_buffer);
    let bridge = Arc::new(bridge);
    let source = Arc::new(GitHubSource::new(&config.api_url, config.request_timeout())?);

    let scheduler = Scheduler::new(
        &config,
        source,
        store,
        Arc::clone(&bridge),
        triggers,
        Arc::new(TokioTimer),
    )?;
    let poller = scheduler.spawn();

    // -- console stand-in for the tray UI ------------------------------------
    println!("{}", input::HELP);
    let input_task = tokio::spawn(input::listen(Arc::clone(&bridge), control.clone()));

    // -- main event loop -----------------------------------------------------
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => present(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            () = control.wait_for_phase(PollPhase::Stopped) => break,
        }
    }

    control.cancel();
    // Nobody drains events past this point.
    drop(events);
    let state = poller.await.context("poll task panicked")?;
    input_task.abort();

    info!(
        failures = state.consecutive_failures,
        last_success = ?state.last_success_at,
        "shut down"
    );
    Ok(())
}

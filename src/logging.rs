//! Logging setup.
//!
//! Structured logs go to stderr through `tracing-subscriber`.  `RUST_LOG`
//! takes precedence; otherwise `level` applies to this crate and `warn` to
//! everything else (reqwest/hyper are chatty at debug).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

/// Install the global subscriber.  Call once at startup.
pub fn init_logging(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(level)))
        .map_err(|e| Error::Config(format!("invalid log level {level:?}: {e}")))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialised: {e}")))
}

fn default_directives(level: &str) -> String {
    format!("warn,ghnotify_sync={level},ghnotify={level}")
}

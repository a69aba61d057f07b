//! Tracing subscriber setup
//!
//! [`init_tracing`] installs a global subscriber built from
//! [`LoggingConfig`]: an `EnvFilter` honoring `RUST_LOG` with the configured
//! level as the default directive, and a human-readable or JSON fmt layer
//! writing to stderr.

use std::io;

use procmirror_domain::{LoggingConfig, MirrorError, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install the global tracing subscriber.
///
/// Returns `Ok(false)` without changing anything if a global subscriber is
/// already set, so calling this more than once is harmless.
///
/// # Errors
/// Returns `MirrorError::Config` if `config.level` is not a valid level.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = env_filter(config)?;

    let layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_target(true)
            .with_thread_names(true)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .with_filter(filter)
            .boxed()
    };

    let installed = tracing_subscriber::registry().with(layer).try_init().is_ok();
    if installed {
        tracing::debug!(level = %config.level, json = config.json, "tracing initialised");
    }
    Ok(installed)
}

/// Parse the configured level into a default filter directive.
///
/// # Errors
/// Returns `MirrorError::Config` for anything `LevelFilter` cannot parse.
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|e| MirrorError::Config(format!("Invalid log level '{}': {}", level, e)))
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let default_level = parse_level(&config.level)?;
    Ok(EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy())
}

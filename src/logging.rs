//! Structured logging setup
//!
//! Diagnostics go to stderr through `tracing`, so they never interleave with
//! scanner output on stdout. `RUST_LOG` takes precedence over the configured
//! level.

use crate::config::Config;
use anyhow::Result;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Filter built from the configured level, overridable through `RUST_LOG`
pub fn env_filter(config: &Config) -> Result<EnvFilter> {
    let level = config.log_level()?;
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy())
}

/// Build a subscriber in the configured format writing to `writer`
///
/// Unknown formats fall back to compact output; [`Config::validate`] rejects
/// them before this point.
pub fn build_subscriber<W>(
    format: &str,
    filter: EnvFilter,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false);

    match format.to_lowercase().as_str() {
        "json" => Box::new(builder.json().finish()),
        "pretty" => Box::new(builder.pretty().finish()),
        _ => Box::new(builder.compact().finish()),
    }
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns an error if the level is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = env_filter(config)?;
    let subscriber = build_subscriber(&config.logging.format, filter, std::io::stderr);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

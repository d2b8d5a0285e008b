//! # Logging
//!
//! Where `accord-node` sends its `tracing` output. The protocol crate emits
//! the events (proposals out, signatures in, notarisation, aborts); this
//! module only picks the format and the filter.
//!
//! Everything goes to stderr. Stdout carries the demo report and the
//! metrics dump, and stays parseable when piped.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Coloured, multi-field lines for a terminal.
    Pretty,
    /// One flattened JSON object per event.
    Json,
}

/// `RUST_LOG` wins when it is set and parses; otherwise `fallback`, which
/// comes from `--log` / `ACCORD_LOG`.
fn env_filter(rust_log: Option<String>, fallback: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

/// Install the global subscriber. Fails if one is already installed.
///
/// ```text
/// RUST_LOG=accord_protocol::flows=debug accord-node demo
/// ```
pub fn init_logging(fallback: &str, format: LogFormat) -> Result<()> {
    let filter = env_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), fallback);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
    };
    installed.context("a tracing subscriber is already installed")?;

    tracing::debug!(?format, "logging ready");
    Ok(())
}

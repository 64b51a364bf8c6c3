//! Logging initialization for Parley.
//!
//! Supports three formats:
//! - `pretty`: multi-line human-readable output
//! - `component`: `timestamp LEVEL target: message fields`, compact and grep-friendly
//! - `json`: structured JSON lines for log aggregators (e.g. Loki, CloudWatch)
//!
//! Logs go to stderr unless a file is configured, so streamed chat output on
//! stdout stays clean.

use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::Result;

/// Initialize the global tracing subscriber from config.
///
/// Call this once at startup before any tracing events are emitted.
/// Falls back to `RUST_LOG` env var; if unset, uses `cfg.level`. A second
/// call leaves the first subscriber in place.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    if let Some(path) = &cfg.file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let writer = Mutex::new(file);
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(writer);
        let _ = match cfg.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Component => builder.with_target(true).compact().try_init(),
        };
        return Ok(());
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = match cfg.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Component => builder.with_target(true).compact().try_init(),
    };
    Ok(())
}

//! Tracing setup shared by binaries (feature `tracing-init`).
//!
//! `RUST_LOG` sets the filter (default [`DEFAULT_LOG_FILTER`]). When `LOG_FILE` is set, logs
//! are appended there as plain text through a non-blocking writer; otherwise they go to stderr
//! so stdout stays clean for reports.

use std::fs::OpenOptions;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info,hyper_util=off";

/// Keeps the file writer alive; drop it only at process exit so buffered lines are flushed.
#[must_use]
pub struct TracingGuard {
    _file: Option<WorkerGuard>,
}

/// Installs the global subscriber. Errors if the log file cannot be opened or a subscriber
/// is already set.
pub fn init_tracing() -> Result<TracingGuard, Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match std::env::var("LOG_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()?;
            tracing::info!(path = %path, "factcheck logging to file");
            Ok(TracingGuard { _file: Some(guard) })
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()?;
            Ok(TracingGuard { _file: None })
        }
    }
}

//! Logger module
//!
//! Sets up the `tracing` subscriber and provides the small logging helpers
//! used across the crate, including one access-log line per transfer.

mod format;

pub use format::TransferLogEntry;

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use crate::transfer::TransferState;
use tracing_subscriber::EnvFilter;

/// Target of access-log lines, filterable on its own
pub const ACCESS_TARGET: &str = "httpsim::access";

/// Initialize the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Should be called
/// once at application startup.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Logger(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Logger(e.to_string()))
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

pub fn log_transition(path: &str, from: TransferState, to: TransferState) {
    tracing::debug!(path, %from, %to, "transfer transition");
}

/// Log formatted access log entry
pub fn log_access(entry: &TransferLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}

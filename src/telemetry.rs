//! Tracing subscriber setup for the command-line tool.
//!
//! Logs go to stderr so that command output on stdout stays machine-readable.

use crate::error::{CseError, Result};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG`, when set, wins over `log_level`.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init(log_level: &str, json: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.with_ansi(false).try_init()
    };
    installed.map_err(|e| CseError::TelemetryError(e.to_string()))
}

//! Logging infrastructure for polliwog
//!
//! Progress is narrated on stdout while a structured copy goes to
//! `~/.local/state/polliwog/polliwog.log` following XDG standards.

use crate::config::{Config, LoggingConfig};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Map the `-v` flag count onto a filter level. Zero keeps the configured
/// level.
fn effective_level(configured: &str, verbosity: u8) -> String {
    match verbosity {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Initialize the logging system
///
/// Sets up tracing with:
/// - A compact stdout layer so the run narrates itself
/// - File output to the XDG state directory with daily rotation
/// - Configurable log level via config or RUST_LOG env var; a non-zero
///   `verbosity` from the command line wins over both
pub fn init(config: &LoggingConfig, verbosity: u8) -> crate::error::Result<LoggingGuard> {
    let log_dir = Config::state_dir();

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "polliwog.log");

    // Non-blocking writer for better performance
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // An explicit -v beats the env var and the config file
    let filter = if verbosity > 0 {
        EnvFilter::new(effective_level(&config.level, verbosity))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    // Stdout layer - terse, user-facing narration
    let stdout_layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();

    // File layer - structured logging with timestamps
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    tracing::debug!(
        log_dir = %log_dir.display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Initialize logging for tests (logs to the test writer)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Returns the log file path
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path();
        assert!(path.ends_with("polliwog.log"));
    }

    #[test]
    fn test_verbosity_lowers_level() {
        assert_eq!(effective_level("info", 0), "info");
        assert_eq!(effective_level("warn", 1), "debug");
        assert_eq!(effective_level("info", 2), "trace");
        assert_eq!(effective_level("info", 5), "trace");
    }
}

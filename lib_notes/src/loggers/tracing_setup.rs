//! # Tracing Setup
//!
//! Installs a global subscriber with:
//! - an `EnvFilter` taken from `RUST_LOG`, or the configured level when unset;
//! - a console `fmt` layer;
//! - optionally, a daily-rolling file in `log_dir` written through a
//!   non-blocking worker. Only the newest `MAX_LOG_FILES` files are kept.

use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Rolled files retained in the log directory.
pub const MAX_LOG_FILES: usize = 7;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log filter '{0}': {1}")]
    Filter(String, String),

    #[error("could not prepare log directory {0}: {1}")]
    Directory(String, String),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Keeps the file writer alive. Dropping it flushes buffered lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Installs the global subscriber.
///
/// # Arguments
/// * `app_name` - File name prefix, e.g. `server_notes` gives `server_notes.2025-01-01.log`.
/// * `log_dir` - Directory for rolled files; `None` logs to the console only.
/// * `level` - Default filter directive when `RUST_LOG` is not set.
pub fn init_tracing(
    app_name: &str,
    log_dir: Option<&Path>,
    level: &str,
) -> Result<LogGuard, LoggerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| LoggerError::Filter(level.to_string(), e.to_string()))?,
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = build_file_appender(app_name, dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggerError::AlreadyInstalled(e.to_string()))?;

    Ok(LogGuard { _file: guard })
}

/// Creates `dir` if needed and opens a daily-rolling appender in it.
pub fn build_file_appender(app_name: &str, dir: &Path) -> Result<RollingFileAppender, LoggerError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| LoggerError::Directory(dir.display().to_string(), e.to_string()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(app_name)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .map_err(|e| LoggerError::Directory(dir.display().to_string(), e.to_string()))
}

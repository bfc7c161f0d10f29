//! Logging setup.
//!
//! Logs go to stderr and, when [`LoggingConfig::file`] is set, to that file
//! through a non-blocking writer. `RUST_LOG` overrides the configured level.

use std::path::Path;
use std::str::FromStr;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigError, LoggingConfig};

/// Keeps the file writer flushing. Logs written after it is dropped may be
/// lost, so hold it for the life of the program.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

impl std::fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("file", &self._file.is_some())
            .finish()
    }
}

/// Install the global subscriber.
///
/// Fails if the level or file is unusable, or if a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    let (file_layer, file_guard) = match &config.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::debug!(
        level = %config.level,
        file = ?config.file,
        "Logging initialized"
    );
    Ok(LoggingGuard { _file: file_guard })
}

fn level_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    let level = tracing::Level::from_str(level.trim()).map_err(|_| {
        ConfigError::invalid(
            "logging.level",
            level,
            "expected one of error, warn, info, debug, trace",
        )
    })?;
    Ok(EnvFilter::new(level.to_string().to_lowercase()))
}

fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), ConfigError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ConfigError::invalid("logging.file", path.display(), "must name a file")
        })?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|e| ConfigError::Logging(e.to_string()))?;
    Ok(tracing_appender::non_blocking(appender))
}

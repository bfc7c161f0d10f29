//! Reader configuration.
//!
//! [`ReaderConfig`] gathers everything a reading session and the CLI need:
//! window size, buffer thresholds, chapter visibility and logging. It is
//! loaded from an INI file by [`ConfigFile`]; a missing file means defaults.

mod file;

pub use file::{config_file_path, ConfigFile, CONFIG_FILE_NAME};

use std::path::PathBuf;

use thiserror::Error;

use crate::buffer::BufferConfig;
use crate::chapter::VisibilitySettings;
use crate::window::DEFAULT_CHAPTERS_PER_WINDOW;

/// Default log level when neither the config file nor `RUST_LOG` sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid INI.
    #[error("Config parse error: {0}")]
    Parse(String),

    /// A key holds a value that cannot be used.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The log subscriber or file writer could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Window sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Chapters bundled into each window.
    pub chapters_per_window: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            chapters_per_window: DEFAULT_CHAPTERS_PER_WINDOW,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Base level (`error`, `warn`, `info`, `debug`, `trace`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,

    /// Also write logs to this file when set.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Complete reader configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReaderConfig {
    pub window: WindowConfig,
    /// Thresholds and assembly timeout. Its window size is taken from
    /// [`window`](Self::window) by [`buffer_config`](Self::buffer_config).
    pub buffer: BufferConfig,
    pub visibility: VisibilitySettings,
    pub logging: LoggingConfig,
}

impl ReaderConfig {
    /// Buffer configuration with the window size applied.
    pub fn buffer_config(&self) -> BufferConfig {
        self.buffer
            .clone()
            .with_chapters_per_window(self.window.chapters_per_window)
    }
}

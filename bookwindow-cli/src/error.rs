//! CLI error type.

use std::fmt;

use bookwindow::chapter::SourceError;
use bookwindow::config::ConfigError;
use bookwindow::SessionError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or logging could not start.
    Config(ConfigError),

    /// The chapter manifest could not be read.
    Manifest(SourceError),

    /// The reading session could not be opened.
    Session(SessionError),

    /// A command-line argument is out of range.
    InvalidArgument(String),

    /// Failed to create the Tokio runtime.
    RuntimeCreation(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Manifest(e) => write!(f, "Failed to load manifest: {}", e),
            CliError::Session(e) => write!(f, "Failed to open document: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::RuntimeCreation(msg) => {
                write!(f, "Failed to create Tokio runtime: {}", msg)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Manifest(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::InvalidArgument(_) => None,
            CliError::RuntimeCreation(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::Manifest(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_display() {
        let err = CliError::InvalidArgument("--pages-per-window must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid argument: --pages-per-window must be at least 1"
        );
    }

    #[test]
    fn test_cli_error_from_session_error() {
        let source = SourceError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err: CliError = SessionError::from(source).into();
        assert!(matches!(err, CliError::Session(_)));
        assert!(err.to_string().starts_with("Failed to open document"));
    }
}

//! Common helpers shared across CLI commands.

use std::path::{Path, PathBuf};

use bookwindow::chapter::{Chapter, ChapterSource, ManifestSource};
use bookwindow::config::{config_file_path, ConfigFile, ReaderConfig};

use crate::error::CliError;

/// Config file to use: the `--config` override, else the default location.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    cli_path.map(Path::to_path_buf).or_else(config_file_path)
}

/// Load the reader configuration, falling back to defaults when no config
/// file exists.
pub fn load_config(cli_path: Option<&Path>) -> Result<ReaderConfig, CliError> {
    match resolve_config_path(cli_path) {
        Some(path) => Ok(ConfigFile::load(&path)?),
        None => Ok(ReaderConfig::default()),
    }
}

/// Read the chapter list from a manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<Chapter>, CliError> {
    Ok(ManifestSource::new(path).load_chapters()?)
}

/// Apply a `--chapters-per-window` override.
pub fn apply_window_size(
    config: &mut ReaderConfig,
    chapters_per_window: Option<usize>,
) -> Result<(), CliError> {
    if let Some(n) = chapters_per_window {
        if n == 0 {
            return Err(CliError::InvalidArgument(
                "--chapters-per-window must be at least 1".to_string(),
            ));
        }
        config.window.chapters_per_window = n;
    }
    Ok(())
}

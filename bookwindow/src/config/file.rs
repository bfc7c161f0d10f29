//! INI configuration file.
//!
//! ```ini
//! [window]
//! chapters_per_window = 5
//!
//! [buffer]
//! forward_threshold = 0.75
//! backward_threshold = 0.25
//! assembly_timeout_secs = 10
//!
//! [visibility]
//! include_cover = true
//! include_front_matter = true
//! include_non_linear = false
//!
//! [logging]
//! level = info
//! file = /var/log/bookwindow.log
//! ```
//!
//! Every key is optional; absent keys keep their default.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use super::{ConfigError, ReaderConfig};

/// File name under the `bookwindow` config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default config file location: `<config dir>/bookwindow/config.ini`.
///
/// `None` when the platform has no config directory.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bookwindow").join(CONFIG_FILE_NAME))
}

/// Loads and saves [`ReaderConfig`] as INI.
pub struct ConfigFile;

impl ConfigFile {
    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<ReaderConfig, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(ReaderConfig::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(e) => ConfigError::Io(e),
            ini::Error::Parse(e) => ConfigError::Parse(e.to_string()),
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(text: &str) -> Result<ReaderConfig, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    /// Write a config file, creating its directory if needed.
    pub fn save(config: &ReaderConfig, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::to_ini(config).write_to_file(path)?;
        Ok(())
    }

    /// Render a config as INI text.
    pub fn render(config: &ReaderConfig) -> Result<String, ConfigError> {
        let mut out = Vec::new();
        Self::to_ini(config).write_to(&mut out)?;
        String::from_utf8(out).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn to_ini(config: &ReaderConfig) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("window")).set(
            "chapters_per_window",
            config.window.chapters_per_window.to_string(),
        );
        ini.with_section(Some("buffer"))
            .set(
                "forward_threshold",
                config.buffer.forward_threshold.to_string(),
            )
            .set(
                "backward_threshold",
                config.buffer.backward_threshold.to_string(),
            )
            .set(
                "assembly_timeout_secs",
                config.buffer.assembly_timeout.as_secs().to_string(),
            );
        ini.with_section(Some("visibility"))
            .set("include_cover", config.visibility.include_cover.to_string())
            .set(
                "include_front_matter",
                config.visibility.include_front_matter.to_string(),
            )
            .set(
                "include_non_linear",
                config.visibility.include_non_linear.to_string(),
            );

        let mut logging = ini.with_section(Some("logging"));
        logging.set("level", config.logging.level.as_str());
        if let Some(file) = &config.logging.file {
            logging.set("file", file.display().to_string());
        }
        ini
    }

    fn from_ini(ini: &Ini) -> Result<ReaderConfig, ConfigError> {
        let mut config = ReaderConfig::default();

        if let Some(section) = ini.section(Some("window")) {
            if let Some(value) = section.get("chapters_per_window") {
                let n: usize = parse_value("window.chapters_per_window", value)?;
                if n == 0 {
                    return Err(ConfigError::invalid(
                        "window.chapters_per_window",
                        value,
                        "must be greater than zero",
                    ));
                }
                config.window.chapters_per_window = n;
            }
        }

        if let Some(section) = ini.section(Some("buffer")) {
            if let Some(value) = section.get("forward_threshold") {
                config.buffer.forward_threshold =
                    parse_threshold("buffer.forward_threshold", value)?;
            }
            if let Some(value) = section.get("backward_threshold") {
                config.buffer.backward_threshold =
                    parse_threshold("buffer.backward_threshold", value)?;
            }
            if let Some(value) = section.get("assembly_timeout_secs") {
                let secs: u64 = parse_value("buffer.assembly_timeout_secs", value)?;
                if secs == 0 {
                    return Err(ConfigError::invalid(
                        "buffer.assembly_timeout_secs",
                        value,
                        "must be greater than zero",
                    ));
                }
                config.buffer.assembly_timeout = Duration::from_secs(secs);
            }
        }
        if config.buffer.backward_threshold >= config.buffer.forward_threshold {
            return Err(ConfigError::invalid(
                "buffer.backward_threshold",
                config.buffer.backward_threshold,
                format!(
                    "must be below forward_threshold ({})",
                    config.buffer.forward_threshold
                ),
            ));
        }

        if let Some(section) = ini.section(Some("visibility")) {
            if let Some(value) = section.get("include_cover") {
                config.visibility.include_cover = parse_value("visibility.include_cover", value)?;
            }
            if let Some(value) = section.get("include_front_matter") {
                config.visibility.include_front_matter =
                    parse_value("visibility.include_front_matter", value)?;
            }
            if let Some(value) = section.get("include_non_linear") {
                config.visibility.include_non_linear =
                    parse_value("visibility.include_non_linear", value)?;
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(value) = section.get("level") {
                let level = value.trim().to_lowercase();
                if tracing::Level::from_str(&level).is_err() {
                    return Err(ConfigError::invalid(
                        "logging.level",
                        value,
                        "expected one of error, warn, info, debug, trace",
                    ));
                }
                config.logging.level = level;
            }
            if let Some(value) = section.get("file") {
                let value = value.trim();
                if !value.is_empty() {
                    config.logging.file = Some(PathBuf::from(value));
                }
            }
        }

        Ok(config)
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, value, e.to_string()))
}

fn parse_threshold(key: &str, value: &str) -> Result<f32, ConfigError> {
    let threshold: f32 = parse_value(key, value)?;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigError::invalid(key, value, "must be between 0 and 1"));
    }
    Ok(threshold)
}

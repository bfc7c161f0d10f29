//! Chapter sources.
//!
//! The core never parses documents itself. A [`ChapterSource`] hands it the
//! raw chapter list; [`ManifestSource`] reads that list from a small JSON
//! manifest so tools can drive the core without a document parser.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::{Chapter, ChapterRole};

/// Errors that can occur while loading a chapter list.
#[derive(Debug, Error)]
pub enum SourceError {
    /// I/O error reading the source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest could not be parsed.
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Supplies the raw, ordered chapter list of one document.
pub trait ChapterSource: Send + Sync {
    /// Load every chapter in raw order.
    fn load_chapters(&self) -> Result<Vec<Chapter>, SourceError>;
}

impl ChapterSource for Vec<Chapter> {
    fn load_chapters(&self) -> Result<Vec<Chapter>, SourceError> {
        Ok(self.clone())
    }
}

/// One chapter entry in a manifest file.
#[derive(Debug, Clone, Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    role: ChapterRole,
    #[serde(default = "default_linear")]
    linear: bool,
}

fn default_linear() -> bool {
    true
}

/// Top-level manifest document.
#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    #[serde(default)]
    title: Option<String>,
    chapters: Vec<ManifestEntry>,
}

/// Chapter source backed by a JSON manifest file.
///
/// # Format
///
/// ```json
/// {
///   "title": "Example",
///   "chapters": [
///     { "role": "cover" },
///     { "role": "navigation" },
///     { "role": "content" },
///     { "role": "content", "linear": false }
///   ]
/// }
/// ```
///
/// `role` defaults to `content` and `linear` to `true`. The raw index of each
/// chapter is its position in the array.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse chapters from manifest JSON text.
    pub fn parse(json: &str) -> Result<Vec<Chapter>, SourceError> {
        let manifest: Manifest = serde_json::from_str(json)?;
        tracing::debug!(
            title = manifest.title.as_deref().unwrap_or("(untitled)"),
            chapters = manifest.chapters.len(),
            "Parsed chapter manifest"
        );
        Ok(manifest
            .chapters
            .into_iter()
            .enumerate()
            .map(|(raw, entry)| Chapter::new(raw, entry.role, entry.linear))
            .collect())
    }
}

impl ChapterSource for ManifestSource {
    fn load_chapters(&self) -> Result<Vec<Chapter>, SourceError> {
        let json = std::fs::read_to_string(&self.path)?;
        Self::parse(&json)
    }
}

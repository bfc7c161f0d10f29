//! Raw⇄visible chapter index mapping.

use std::collections::HashMap;

use super::{Chapter, ChapterClassifier, VisibilitySettings};

/// Bidirectional mapping between raw chapter positions and visible positions.
///
/// Rebuilt in full whenever the chapter list or visibility settings change;
/// there is no incremental patching. Lookups are O(1).
///
/// # Example
///
/// ```
/// use bookwindow::chapter::{Chapter, ChapterRole, IndexProvider, VisibilitySettings};
///
/// let chapters = vec![
///     Chapter::new(0, ChapterRole::Navigation, true),
///     Chapter::content(1),
///     Chapter::content(2),
/// ];
/// let mut index = IndexProvider::new();
/// index.set_chapters(chapters, VisibilitySettings::default());
///
/// assert_eq!(index.visible_chapter_count(), 2);
/// assert_eq!(index.raw_to_visible(0), None);
/// assert_eq!(index.visible_to_raw(0), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct IndexProvider {
    chapters: Vec<Chapter>,
    visibility: VisibilitySettings,
    /// visible index -> raw index (dense)
    visible_to_raw: Vec<usize>,
    /// raw index -> visible index (only visible chapters present)
    raw_to_visible: HashMap<usize, usize>,
}

impl IndexProvider {
    /// Create an empty provider with default visibility.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider and build it from the given chapters.
    pub fn with_chapters(chapters: Vec<Chapter>, visibility: VisibilitySettings) -> Self {
        let mut provider = Self::new();
        provider.set_chapters(chapters, visibility);
        provider
    }

    /// Replace the chapter list and visibility settings, rebuilding both maps.
    ///
    /// Chapters are keyed by their position in `chapters`; the stored
    /// `raw_index` of each chapter is expected to match that position.
    pub fn set_chapters(&mut self, chapters: Vec<Chapter>, visibility: VisibilitySettings) {
        self.chapters = chapters;
        self.visibility = visibility;
        self.rebuild();
    }

    /// Change visibility settings, keeping the current chapter list.
    pub fn set_visibility(&mut self, visibility: VisibilitySettings) {
        self.visibility = visibility;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.visible_to_raw.clear();
        self.raw_to_visible.clear();

        for (raw, chapter) in self.chapters.iter().enumerate() {
            if chapter.raw_index != raw {
                tracing::warn!(
                    position = raw,
                    raw_index = chapter.raw_index,
                    "Chapter raw index does not match its list position"
                );
            }
            if ChapterClassifier::is_visible(chapter, &self.visibility) {
                self.raw_to_visible.insert(raw, self.visible_to_raw.len());
                self.visible_to_raw.push(raw);
            }
        }

        tracing::debug!(
            raw = self.chapters.len(),
            visible = self.visible_to_raw.len(),
            visibility = ?self.visibility,
            "Rebuilt visible chapter index"
        );
    }

    /// Visible position of a raw chapter, or `None` if it is hidden or unknown.
    pub fn raw_to_visible(&self, raw_index: usize) -> Option<usize> {
        self.raw_to_visible.get(&raw_index).copied()
    }

    /// Raw position of a visible chapter, or `None` if out of range.
    pub fn visible_to_raw(&self, visible_index: usize) -> Option<usize> {
        self.visible_to_raw.get(visible_index).copied()
    }

    pub fn visible_chapter_count(&self) -> usize {
        self.visible_to_raw.len()
    }

    pub fn raw_chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_visible(&self, raw_index: usize) -> bool {
        self.raw_to_visible.contains_key(&raw_index)
    }

    /// Current visibility settings.
    pub fn visibility(&self) -> VisibilitySettings {
        self.visibility
    }

    /// Visible chapters in reading order.
    pub fn visible_chapters(&self) -> impl Iterator<Item = &Chapter> + '_ {
        self.visible_to_raw
            .iter()
            .filter_map(move |&raw| self.chapters.get(raw))
    }

    /// Nearest visible chapter at or after `raw_index`, falling back to the
    /// nearest one before it.
    pub fn nearest_visible(&self, raw_index: usize) -> Option<usize> {
        let after = self.visible_to_raw.partition_point(|&raw| raw < raw_index);
        if after < self.visible_to_raw.len() {
            Some(after)
        } else {
            after.checked_sub(1)
        }
    }
}

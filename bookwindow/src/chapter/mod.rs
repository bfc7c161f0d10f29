//! Chapter classification and visible-index mapping.
//!
//! A parsed book is an ordered list of [`Chapter`]s, each tagged with a
//! structural [`ChapterRole`]. Not every chapter is shown to the reader:
//! navigation documents never are, and covers, front matter and non-linear
//! chapters depend on [`VisibilitySettings`].
//!
//! The [`IndexProvider`] turns the raw list into a dense *visible* sequence
//! and answers raw⇄visible lookups. Window math downstream always runs on the
//! visible count; mixing raw and visible counts shifts every window boundary.
//!
//! ```text
//! raw:      0:cover 1:nav 2:content 3:content 4:nonlinear 5:content
//! visible:  0       -     1         2         -           3
//! ```

mod index;
mod source;

pub use index::IndexProvider;
pub use source::{ChapterSource, ManifestSource, SourceError};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structural role of a chapter within the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterRole {
    /// Body text. Always visible.
    #[default]
    Content,
    /// Title page, copyright, dedication and similar.
    FrontMatter,
    /// Cover image page.
    Cover,
    /// Table of contents or other navigation document. Never visible.
    Navigation,
    /// Auxiliary content outside the linear reading order.
    NonLinear,
}

impl ChapterRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterRole::Content => "content",
            ChapterRole::FrontMatter => "front_matter",
            ChapterRole::Cover => "cover",
            ChapterRole::Navigation => "navigation",
            ChapterRole::NonLinear => "non_linear",
        }
    }
}

impl fmt::Display for ChapterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chapter as parsed from the document. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Position in the raw (unfiltered) chapter list.
    pub raw_index: usize,
    /// Structural role.
    pub role: ChapterRole,
    /// Whether the chapter is part of the linear reading order.
    pub is_linear: bool,
}

impl Chapter {
    pub fn new(raw_index: usize, role: ChapterRole, is_linear: bool) -> Self {
        Self {
            raw_index,
            role,
            is_linear,
        }
    }

    /// A linear body chapter.
    pub fn content(raw_index: usize) -> Self {
        Self::new(raw_index, ChapterRole::Content, true)
    }
}

/// Which optional chapter roles are shown to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilitySettings {
    pub include_cover: bool,
    pub include_front_matter: bool,
    pub include_non_linear: bool,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            include_cover: true,
            include_front_matter: true,
            include_non_linear: false,
        }
    }
}

impl VisibilitySettings {
    /// Only body content.
    pub fn content_only() -> Self {
        Self {
            include_cover: false,
            include_front_matter: false,
            include_non_linear: false,
        }
    }

    /// Everything except navigation.
    pub fn everything() -> Self {
        Self {
            include_cover: true,
            include_front_matter: true,
            include_non_linear: true,
        }
    }
}

/// Decides whether a chapter is visible.
///
/// Visibility follows the tagged role only. The `is_linear` flag is carried
/// for consumers but never hides a `Content` chapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChapterClassifier;

impl ChapterClassifier {
    pub fn classify(chapter: &Chapter) -> ChapterRole {
        chapter.role
    }

    /// Whether a chapter with the given role is visible.
    pub fn is_role_visible(role: ChapterRole, visibility: &VisibilitySettings) -> bool {
        match role {
            ChapterRole::Content => true,
            ChapterRole::Navigation => false,
            ChapterRole::Cover => visibility.include_cover,
            ChapterRole::FrontMatter => visibility.include_front_matter,
            ChapterRole::NonLinear => visibility.include_non_linear,
        }
    }

    pub fn is_visible(chapter: &Chapter, visibility: &VisibilitySettings) -> bool {
        Self::is_role_visible(Self::classify(chapter), visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(ChapterRole::FrontMatter.to_string(), "front_matter");
        assert_eq!(ChapterRole::NonLinear.to_string(), "non_linear");
    }

    #[test]
    fn test_role_serde_names() {
        let role: ChapterRole = serde_json::from_str("\"front_matter\"").unwrap();
        assert_eq!(role, ChapterRole::FrontMatter);
        assert_eq!(
            serde_json::to_string(&ChapterRole::Navigation).unwrap(),
            "\"navigation\""
        );
    }

    #[test]
    fn test_classify_keeps_tagged_role() {
        let aside = Chapter::new(1, ChapterRole::Content, false);
        assert_eq!(ChapterClassifier::classify(&aside), ChapterRole::Content);
        let note = Chapter::new(2, ChapterRole::NonLinear, false);
        assert_eq!(ChapterClassifier::classify(&note), ChapterRole::NonLinear);
    }

    #[test]
    fn test_off_spine_content_stays_visible() {
        let aside = Chapter::new(1, ChapterRole::Content, false);
        assert!(ChapterClassifier::is_visible(
            &aside,
            &VisibilitySettings::content_only()
        ));
        assert!(ChapterClassifier::is_visible(
            &aside,
            &VisibilitySettings::default()
        ));
    }

    #[test]
    fn test_navigation_never_visible() {
        let nav = Chapter::new(0, ChapterRole::Navigation, true);
        assert!(!ChapterClassifier::is_visible(
            &nav,
            &VisibilitySettings::everything()
        ));
    }

    #[test]
    fn test_content_always_visible() {
        assert!(ChapterClassifier::is_visible(
            &Chapter::content(0),
            &VisibilitySettings::content_only()
        ));
    }

    #[test]
    fn test_optional_roles_follow_settings() {
        let cover = Chapter::new(0, ChapterRole::Cover, true);
        let front = Chapter::new(1, ChapterRole::FrontMatter, true);
        let extra = Chapter::new(2, ChapterRole::NonLinear, false);

        let defaults = VisibilitySettings::default();
        assert!(ChapterClassifier::is_visible(&cover, &defaults));
        assert!(ChapterClassifier::is_visible(&front, &defaults));
        assert!(!ChapterClassifier::is_visible(&extra, &defaults));

        let none = VisibilitySettings::content_only();
        assert!(!ChapterClassifier::is_visible(&cover, &none));
        assert!(!ChapterClassifier::is_visible(&front, &none));
        assert!(!ChapterClassifier::is_visible(&extra, &none));
    }
}

//! Validated window layout.

use std::num::NonZeroUsize;

use super::calculator::{WindowCalculator, WindowError, WindowRange};

/// A chapter count paired with a validated window size.
///
/// Construction rejects a zero window size, so every method afterwards is
/// infallible. Derived values are recomputed on demand from the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    chapter_count: usize,
    chapters_per_window: NonZeroUsize,
}

impl WindowLayout {
    /// Create a layout, failing fast on a zero window size.
    pub fn new(chapter_count: usize, chapters_per_window: usize) -> Result<Self, WindowError> {
        let chapters_per_window =
            NonZeroUsize::new(chapters_per_window).ok_or_else(WindowError::zero_window_size)?;
        Ok(Self {
            chapter_count,
            chapters_per_window,
        })
    }

    /// Number of chapters the layout covers.
    pub fn chapter_count(&self) -> usize {
        self.chapter_count
    }

    /// Chapters bundled into each window.
    pub fn chapters_per_window(&self) -> usize {
        self.chapters_per_window.get()
    }

    /// Same layout with a different chapter count.
    pub fn with_chapter_count(self, chapter_count: usize) -> Self {
        Self {
            chapter_count,
            ..self
        }
    }

    pub fn window_count(&self) -> usize {
        self.chapter_count.div_ceil(self.chapters_per_window.get())
    }

    pub fn window_for_chapter(&self, chapter_index: usize) -> usize {
        chapter_index / self.chapters_per_window.get()
    }

    /// Index of the last window, or `None` for an empty document.
    pub fn last_window(&self) -> Option<usize> {
        self.window_count().checked_sub(1)
    }

    pub fn window_range(&self, window_index: usize) -> Option<WindowRange> {
        // The size is non-zero, so the calculator cannot fail here.
        WindowCalculator::window_range(
            window_index,
            self.chapter_count,
            self.chapters_per_window.get(),
        )
        .ok()
        .flatten()
    }

    /// Iterate over every window range in order.
    pub fn ranges(&self) -> impl Iterator<Item = WindowRange> + '_ {
        (0..self.window_count()).filter_map(move |window| self.window_range(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_rejects_zero_window_size() {
        assert_eq!(
            WindowLayout::new(10, 0).unwrap_err(),
            WindowCalculator::window_count(10, 0).unwrap_err()
        );
    }

    #[test]
    fn test_layout_matches_calculator() {
        let layout = WindowLayout::new(22, 5).unwrap();
        assert_eq!(layout.window_count(), 5);
        assert_eq!(layout.last_window(), Some(4));
        assert_eq!(layout.window_for_chapter(12), 2);
        assert_eq!(
            layout.window_range(4),
            WindowCalculator::window_range(4, 22, 5).unwrap()
        );
    }

    #[test]
    fn test_empty_layout() {
        let layout = WindowLayout::new(0, 5).unwrap();
        assert_eq!(layout.window_count(), 0);
        assert_eq!(layout.last_window(), None);
        assert_eq!(layout.window_range(0), None);
        assert_eq!(layout.ranges().count(), 0);
    }

    #[test]
    fn test_ranges_cover_document() {
        let layout = WindowLayout::new(12, 5).unwrap();
        let ranges: Vec<_> = layout
            .ranges()
            .map(|r| (r.first_chapter, r.last_chapter))
            .collect();
        assert_eq!(ranges, vec![(0, 4), (5, 9), (10, 11)]);
    }

    #[test]
    fn test_with_chapter_count() {
        let layout = WindowLayout::new(22, 5).unwrap().with_chapter_count(7);
        assert_eq!(layout.chapter_count(), 7);
        assert_eq!(layout.chapters_per_window(), 5);
        assert_eq!(layout.window_count(), 2);
    }
}

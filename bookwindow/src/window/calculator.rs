//! Stateless window calculator.

use std::fmt;

use thiserror::Error;

/// Errors returned by the window calculator.
///
/// Arguments are never silently clamped: a bad input fails the single call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// An argument was outside its valid domain.
    #[error("Invalid argument: {name} = {value} ({reason})")]
    InvalidArgument {
        name: &'static str,
        value: usize,
        reason: &'static str,
    },
}

impl WindowError {
    pub(crate) fn zero_window_size() -> Self {
        WindowError::InvalidArgument {
            name: "chapters_per_window",
            value: 0,
            reason: "must be greater than zero",
        }
    }
}

/// The chapters covered by one window.
///
/// Both chapter bounds are inclusive. A range is always derived from a
/// `(chapter_count, chapters_per_window)` pair and never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowRange {
    /// Index of the window.
    pub window_index: usize,
    /// First chapter in the window (inclusive).
    pub first_chapter: usize,
    /// Last chapter in the window (inclusive).
    pub last_chapter: usize,
}

impl WindowRange {
    /// Number of chapters in this window.
    pub fn chapter_count(&self) -> usize {
        self.last_chapter - self.first_chapter + 1
    }

    /// Whether the given chapter falls inside this window.
    pub fn contains(&self, chapter_index: usize) -> bool {
        (self.first_chapter..=self.last_chapter).contains(&chapter_index)
    }
}

impl fmt::Display for WindowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window {} [{}..={}]",
            self.window_index, self.first_chapter, self.last_chapter
        )
    }
}

/// Pure window math over a chapter count and a window size.
///
/// Holds no state; all methods are associated functions.
///
/// # Example
///
/// ```
/// use bookwindow::window::WindowCalculator;
///
/// assert_eq!(WindowCalculator::window_count(22, 5).unwrap(), 5);
/// let last = WindowCalculator::window_range(4, 22, 5).unwrap().unwrap();
/// assert_eq!((last.first_chapter, last.last_chapter), (20, 21));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowCalculator;

impl WindowCalculator {
    /// Number of windows needed for `chapter_count` chapters.
    ///
    /// Equals `ceil(chapter_count / chapters_per_window)`; zero chapters
    /// yield zero windows.
    pub fn window_count(
        chapter_count: usize,
        chapters_per_window: usize,
    ) -> Result<usize, WindowError> {
        if chapters_per_window == 0 {
            return Err(WindowError::zero_window_size());
        }
        Ok(chapter_count.div_ceil(chapters_per_window))
    }

    /// Window that contains the given chapter.
    pub fn window_for_chapter(
        chapter_index: usize,
        chapters_per_window: usize,
    ) -> Result<usize, WindowError> {
        if chapters_per_window == 0 {
            return Err(WindowError::zero_window_size());
        }
        Ok(chapter_index / chapters_per_window)
    }

    /// Chapter range of a window.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the document has no chapters or `window_index` is not
    /// below the window count. That is an expected lookup miss, not an error.
    pub fn window_range(
        window_index: usize,
        chapter_count: usize,
        chapters_per_window: usize,
    ) -> Result<Option<WindowRange>, WindowError> {
        let count = Self::window_count(chapter_count, chapters_per_window)?;
        if chapter_count == 0 || window_index >= count {
            return Ok(None);
        }

        let first_chapter = window_index * chapters_per_window;
        let last_chapter = (first_chapter + chapters_per_window - 1).min(chapter_count - 1);

        Ok(Some(WindowRange {
            window_index,
            first_chapter,
            last_chapter,
        }))
    }
}

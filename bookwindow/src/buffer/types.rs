//! Value types shared by the buffer manager and its callers.

use std::fmt;

use bytes::Bytes;

/// Lifecycle phase of a buffer.
///
/// `Startup` lasts until the reader first enters the window at the buffer's
/// center slot; from then on the buffer is `Steady` until it is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferPhase {
    /// Initial fill; the reader has not yet reached the center window.
    #[default]
    Startup,
    /// Sliding state; shifts keep the reader near the center.
    Steady,
}

impl fmt::Display for BufferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferPhase::Startup => write!(f, "startup"),
            BufferPhase::Steady => write!(f, "steady"),
        }
    }
}

/// Reading position reported by the page-change callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub window_index: usize,
    /// Visible chapter index.
    pub chapter_index: usize,
    /// Page within the window.
    pub in_page_index: usize,
    /// Progress through the window, in `[0, 1]`.
    pub progress: f32,
}

/// Which way, if any, a position update suggests shifting the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreloadHint {
    /// Neither threshold crossed.
    #[default]
    None,
    /// Progress reached the forward threshold.
    Forward,
    /// Progress fell to the backward threshold.
    Backward,
}

impl PreloadHint {
    pub fn is_none(&self) -> bool {
        matches!(self, PreloadHint::None)
    }
}

impl fmt::Display for PreloadHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreloadHint::None => write!(f, "none"),
            PreloadHint::Forward => write!(f, "forward"),
            PreloadHint::Backward => write!(f, "backward"),
        }
    }
}

/// Assembled content of one window.
///
/// The payload is opaque to the core; only the window identity and whether
/// anything was produced matter here. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowContent {
    window_index: usize,
    data: Bytes,
}

impl WindowContent {
    pub fn new(window_index: usize, data: impl Into<Bytes>) -> Self {
        Self {
            window_index,
            data: data.into(),
        }
    }

    pub fn window_index(&self) -> usize {
        self.window_index
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Point-in-time view of the buffer, readable without the buffer lock.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BufferSnapshot {
    pub phase: BufferPhase,
    /// Buffered window indices in order.
    pub windows: Vec<usize>,
    pub active_window: Option<usize>,
    pub total_windows: usize,
}

impl BufferSnapshot {
    pub fn contains(&self, window_index: usize) -> bool {
        self.windows.contains(&window_index)
    }

    /// Window at the center slot, if the buffer is that long.
    pub fn center(&self) -> Option<usize> {
        self.windows.get(super::CENTER_POS).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(BufferPhase::Startup.to_string(), "startup");
        assert_eq!(BufferPhase::Steady.to_string(), "steady");
        assert_eq!(BufferPhase::default(), BufferPhase::Startup);
    }

    #[test]
    fn test_window_content_accessors() {
        let content = WindowContent::new(3, "<section/>");
        assert_eq!(content.window_index(), 3);
        assert_eq!(content.len(), 10);
        assert!(!content.is_empty());
        assert!(WindowContent::new(0, Bytes::new()).is_empty());
    }

    #[test]
    fn test_snapshot_center() {
        let snapshot = BufferSnapshot {
            windows: vec![4, 5, 6, 7, 8],
            ..Default::default()
        };
        assert_eq!(snapshot.center(), Some(6));
        assert!(snapshot.contains(8));

        let short = BufferSnapshot {
            windows: vec![0, 1],
            ..Default::default()
        };
        assert_eq!(short.center(), None);
    }

    #[test]
    fn test_preload_hint_display() {
        assert_eq!(PreloadHint::Forward.to_string(), "forward");
        assert!(PreloadHint::None.is_none());
        assert!(!PreloadHint::Backward.is_none());
    }
}

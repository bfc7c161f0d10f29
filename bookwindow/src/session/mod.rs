//! Reading session: one open document wired to its buffer.
//!
//! [`ReadingSession`] keeps the visible chapter index and the buffer manager
//! consistent. Window math runs on the visible chapter count, so every
//! visibility change rebuilds the index, resets the buffer and puts the
//! reader back on the window that holds the same raw chapter.
//!
//! Rebuilds run inside a [`ConcurrencyGuard`] build. If the visibility
//! settings change while a rebuild is in flight, the build that closes last
//! sees the drift and rebuilds again with the newer settings.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::buffer::{
    BufferError, BufferLifecycleManager, BufferPhase, PreloadHint, TimeoutAssembler,
    WindowAssembler,
};
use crate::chapter::{ChapterSource, IndexProvider, SourceError, VisibilitySettings};
use crate::config::ReaderConfig;
use crate::guard::ConcurrencyGuard;
use crate::window::{WindowCalculator, WindowError, WindowRange};

/// Rebuild attempts before giving up on settings that keep changing.
const MAX_REBUILD_ATTEMPTS: usize = 3;

/// Errors raised by a reading session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to load chapters: {0}")]
    Source(#[from] SourceError),

    #[error("Failed to create buffer: {0}")]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Settings whose change invalidates a rebuild in flight.
type BuildInputs = (VisibilitySettings, usize);

/// An open document: visible index, buffer manager and rebuild guard.
pub struct ReadingSession {
    index: RwLock<IndexProvider>,
    requested: Arc<RwLock<VisibilitySettings>>,
    manager: Arc<BufferLifecycleManager>,
    guard: ConcurrencyGuard<BuildInputs>,
}

impl std::fmt::Debug for ReadingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingSession")
            .field("visibility", &*self.requested.read())
            .field("manager", &self.manager)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl ReadingSession {
    /// Load the chapter list and start reading at the first window.
    ///
    /// The assembler is wrapped in a [`TimeoutAssembler`] using the
    /// configured assembly timeout. Preloads are spawned on `runtime`.
    pub fn open(
        source: &impl ChapterSource,
        config: &ReaderConfig,
        assembler: Arc<dyn WindowAssembler>,
        runtime: Handle,
    ) -> Result<Self, SessionError> {
        let chapters = source.load_chapters()?;
        let buffer_config = config.buffer_config();
        let chapters_per_window = buffer_config.chapters_per_window;

        let assembler: Arc<dyn WindowAssembler> = Arc::new(TimeoutAssembler::new(
            assembler,
            buffer_config.assembly_timeout,
        ));
        let manager = Arc::new(BufferLifecycleManager::new(
            buffer_config,
            assembler,
            runtime,
        )?);

        let index = IndexProvider::with_chapters(chapters, config.visibility);
        let requested = Arc::new(RwLock::new(config.visibility));
        let source_settings = Arc::clone(&requested);
        let guard = ConcurrencyGuard::new(move || (*source_settings.read(), chapters_per_window));

        manager.set_chapter_count(index.visible_chapter_count());
        manager.initialize(0);

        info!(
            raw_chapters = index.raw_chapter_count(),
            visible_chapters = index.visible_chapter_count(),
            windows = manager.total_windows(),
            chapters_per_window,
            "Reading session opened"
        );

        Ok(Self {
            index: RwLock::new(index),
            requested,
            manager,
            guard,
        })
    }

    pub fn manager(&self) -> &Arc<BufferLifecycleManager> {
        &self.manager
    }

    /// Read access to the visible chapter index.
    pub fn index(&self) -> RwLockReadGuard<'_, IndexProvider> {
        self.index.read()
    }

    pub fn visibility(&self) -> VisibilitySettings {
        *self.requested.read()
    }

    /// Number of windows over the visible chapters.
    pub fn window_count(&self) -> usize {
        self.manager.total_windows()
    }

    /// Visible chapter range of a window.
    pub fn window_range(&self, window_index: usize) -> Result<Option<WindowRange>, SessionError> {
        let range = WindowCalculator::window_range(
            window_index,
            self.index.read().visible_chapter_count(),
            self.manager.config().chapters_per_window,
        )?;
        Ok(range)
    }

    /// Change which chapters are visible.
    ///
    /// Rebuilds the index and the buffer, keeping the reader on the window
    /// that holds the same raw chapter (or the nearest visible one). Returns
    /// the window the reader is on afterwards, or `None` when another rebuild
    /// in flight will apply the change, or the document has no visible
    /// chapters.
    pub fn set_visibility(&self, settings: VisibilitySettings) -> Option<usize> {
        *self.requested.write() = settings;
        self.rebuild()
    }

    fn rebuild(&self) -> Option<usize> {
        for attempt in 1..=MAX_REBUILD_ATTEMPTS {
            let scope = self.guard.scope();
            if !scope.is_outermost() {
                // Whoever closes the outermost build sees the new settings
                if scope.finish() {
                    continue;
                }
                debug!("Visibility rebuild already running, leaving the change to it");
                return None;
            }

            let window = self.rebuild_index();
            if !scope.finish() {
                return window;
            }
            debug!(attempt, "Visibility changed during rebuild, rebuilding again");
        }

        warn!(
            attempts = MAX_REBUILD_ATTEMPTS,
            "Visibility kept changing during rebuild, keeping last result"
        );
        self.manager.get_active_window_index()
    }

    fn rebuild_index(&self) -> Option<usize> {
        let settings = *self.requested.read();
        let mut index = self.index.write();

        let anchor = self.anchor_raw_chapter(&index);
        index.set_visibility(settings);
        self.manager.set_chapter_count(index.visible_chapter_count());

        let visible = match anchor {
            Some(raw) => index.nearest_visible(raw),
            None => Some(0),
        };
        drop(index);

        let window = self.start_at(visible.unwrap_or(0));
        info!(
            anchor_raw = ?anchor,
            window = ?window,
            windows = self.manager.total_windows(),
            visibility = ?settings,
            "Visibility rebuilt"
        );
        window
    }

    /// Raw chapter the reader is on: the reported position if any, else the
    /// first chapter of the active window.
    fn anchor_raw_chapter(&self, index: &IndexProvider) -> Option<usize> {
        let visible = match self.manager.current_position() {
            Some(position) => position.chapter_index,
            None => {
                let window = self.manager.get_active_window_index()?;
                window * self.manager.config().chapters_per_window
            }
        };
        index.visible_to_raw(visible)
    }

    /// Fill the buffer from the window holding `visible_chapter`, enter it
    /// and place the reader at the chapter's first page.
    fn start_at(&self, visible_chapter: usize) -> Option<usize> {
        let Some(last_window) = self.manager.total_windows().checked_sub(1) else {
            self.manager.initialize(0);
            return None;
        };

        let window = WindowCalculator::window_for_chapter(
            visible_chapter,
            self.manager.config().chapters_per_window,
        )
        .ok()?
        .min(last_window);

        self.manager.initialize(window);
        self.manager.on_entered_window(window);
        self.manager.update_position(visible_chapter, 0, 0);
        Some(window)
    }

    /// Move the reader to a raw chapter, e.g. from a table of contents.
    ///
    /// A hidden chapter lands on the nearest visible one. Returns the window
    /// entered, or `None` for an unknown chapter.
    pub fn jump_to_chapter(&self, raw_index: usize) -> Option<usize> {
        let visible = {
            let index = self.index.read();
            if raw_index >= index.raw_chapter_count() {
                warn!(raw_index, "Jump to unknown chapter ignored");
                return None;
            }
            index.nearest_visible(raw_index)?
        };

        let window = self.start_at(visible)?;
        debug!(raw_index, visible, window, "Jumped to chapter");
        Some(window)
    }

    /// Record that the reader entered a window.
    ///
    /// A window outside the buffer (a jump) refills the buffer from it first.
    /// Returns `true` when this moved the buffer to `Steady`.
    pub fn enter_window(&self, window_index: usize) -> bool {
        if window_index >= self.manager.total_windows() {
            warn!(window = window_index, "Ignoring entry into unknown window");
            return false;
        }
        if !self.manager.is_window_in_buffer(window_index) {
            debug!(window = window_index, "Entered window outside buffer, refilling");
            self.manager.initialize(window_index);
        }
        self.manager.on_entered_window(window_index)
    }

    /// Page-change callback.
    ///
    /// Updates the position, enters the position's window when it changed
    /// and, once the buffer is `Steady`, acts on the preload hint: a forward
    /// hint shifts when the active window is past the buffer center, a
    /// backward hint when it is before the center.
    pub fn on_page_changed(
        &self,
        visible_chapter: usize,
        in_page_index: usize,
        total_pages_in_window: usize,
    ) -> PreloadHint {
        let hint =
            self.manager
                .update_position(visible_chapter, in_page_index, total_pages_in_window);

        if let Some(position) = self.manager.current_position() {
            if self.manager.get_active_window_index() != Some(position.window_index) {
                self.enter_window(position.window_index);
            }
        }

        if self.manager.phase() == BufferPhase::Steady {
            self.apply_hint(hint);
        }
        hint
    }

    fn apply_hint(&self, hint: PreloadHint) {
        let (Some(active), Some(center)) = (
            self.manager.get_active_window_index(),
            self.manager.get_center_window_index(),
        ) else {
            return;
        };

        let shifted = match hint {
            PreloadHint::Forward if active > center => self.manager.shift_forward(),
            PreloadHint::Backward if active < center => self.manager.shift_backward(),
            _ => return,
        };
        debug!(hint = %hint, active, center, shifted, "Applied preload hint");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{AssemblyError, BoxFuture, WindowContent};
    use crate::chapter::{Chapter, ChapterRole};

    struct EchoAssembler;

    impl WindowAssembler for EchoAssembler {
        fn assemble_window(
            &self,
            range: WindowRange,
        ) -> BoxFuture<'_, Result<WindowContent, AssemblyError>> {
            Box::pin(async move {
                Ok(WindowContent::new(
                    range.window_index,
                    format!("{}..={}", range.first_chapter, range.last_chapter),
                ))
            })
        }
    }

    /// Cover, navigation, then `content` body chapters, one non-linear note
    /// after every tenth.
    fn book(content: usize) -> Vec<Chapter> {
        let mut chapters = vec![
            Chapter::new(0, ChapterRole::Cover, true),
            Chapter::new(1, ChapterRole::Navigation, true),
        ];
        for i in 0..content {
            chapters.push(Chapter::content(chapters.len()));
            if i % 10 == 9 {
                chapters.push(Chapter::new(chapters.len(), ChapterRole::NonLinear, false));
            }
        }
        chapters
    }

    fn open(chapters: Vec<Chapter>) -> ReadingSession {
        ReadingSession::open(
            &chapters,
            &ReaderConfig::default(),
            Arc::new(EchoAssembler),
            Handle::current(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_open_uses_visible_chapters() {
        // 2 + 50 + 5 notes = 57 raw, cover + 50 content = 51 visible
        let session = open(book(50));
        assert_eq!(session.index().raw_chapter_count(), 57);
        assert_eq!(session.index().visible_chapter_count(), 51);
        assert_eq!(session.window_count(), 11);
        assert_eq!(session.manager().get_buffered_windows(), vec![0, 1, 2, 3, 4]);

        session.manager().wait_for_preloads().await;
        let first = session.manager().get_cached_window(0).unwrap();
        assert_eq!(first.data().as_ref(), b"0..=4");
    }

    #[tokio::test]
    async fn test_open_rejects_bad_window_size() {
        let mut config = ReaderConfig::default();
        config.window.chapters_per_window = 0;
        let result = ReadingSession::open(
            &book(3),
            &config,
            Arc::new(EchoAssembler),
            Handle::current(),
        );
        assert!(matches!(result, Err(SessionError::Buffer(_))));
    }

    #[tokio::test]
    async fn test_window_range_on_visible_count() {
        let session = open(book(20)); // 21 visible
        let range = session.window_range(4).unwrap().unwrap();
        assert_eq!((range.first_chapter, range.last_chapter), (20, 20));
        assert!(session.window_range(5).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_jump_to_chapter() {
        let session = open(book(50));
        // raw 30 is visible chapter 27 -> window 5
        let window = session.jump_to_chapter(30).unwrap();
        assert_eq!(window, 5);
        assert_eq!(session.manager().get_active_window_index(), Some(5));
        assert_eq!(session.manager().get_buffered_windows(), vec![5, 6, 7, 8, 9]);

        assert_eq!(session.jump_to_chapter(1000), None);
    }

    #[tokio::test]
    async fn test_jump_to_hidden_chapter_lands_nearby() {
        let session = open(book(50));
        // raw 1 is navigation; nearest visible after it is raw 2 (visible 1)
        assert_eq!(session.jump_to_chapter(1), Some(0));
    }

    #[tokio::test]
    async fn test_set_visibility_keeps_raw_chapter() {
        let session = open(book(50));
        session.on_page_changed(40, 0, 10); // visible 40 -> raw 44
        let raw = session.index().visible_to_raw(40).unwrap();

        let window = session.set_visibility(VisibilitySettings::everything());
        let index = session.index();
        assert_eq!(index.visible_chapter_count(), 56);
        let visible = index.raw_to_visible(raw).unwrap();
        assert_eq!(window, Some(visible / 5));
        assert_eq!(session.manager().get_active_window_index(), window);
        assert_eq!(session.window_count(), 12);
    }

    #[tokio::test]
    async fn test_set_visibility_to_empty_document() {
        let session = open(vec![Chapter::new(0, ChapterRole::Cover, true)]);
        assert_eq!(session.window_count(), 1);

        assert_eq!(session.set_visibility(VisibilitySettings::content_only()), None);
        assert_eq!(session.window_count(), 0);
        assert!(session.manager().get_buffered_windows().is_empty());
        assert!(!session.guard.is_building());
    }

    #[tokio::test]
    async fn test_page_changes_drive_buffer() {
        let session = open(book(100)); // 101 visible -> 21 windows
        let manager = session.manager();

        // Reading through window 0 and 1 stays in startup
        assert_eq!(session.on_page_changed(0, 9, 10), PreloadHint::Forward);
        session.on_page_changed(5, 0, 10);
        assert_eq!(manager.get_active_window_index(), Some(1));
        assert_eq!(manager.phase(), BufferPhase::Startup);

        // Entering the center window goes steady, no shift at the center
        session.on_page_changed(10, 9, 10);
        assert_eq!(manager.phase(), BufferPhase::Steady);
        assert_eq!(manager.get_buffered_windows(), vec![0, 1, 2, 3, 4]);

        // Past the center a forward hint shifts once
        session.on_page_changed(15, 9, 10);
        assert_eq!(manager.get_buffered_windows(), vec![1, 2, 3, 4, 5]);
        session.on_page_changed(15, 10, 10);
        assert_eq!(manager.get_buffered_windows(), vec![1, 2, 3, 4, 5]);

        // Going back before the center shifts backward
        session.on_page_changed(10, 1, 10);
        assert_eq!(manager.get_active_window_index(), Some(2));
        assert_eq!(manager.get_buffered_windows(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_enter_window_outside_buffer_refills() {
        let session = open(book(100));
        assert!(!session.enter_window(12));
        assert_eq!(session.manager().get_buffered_windows(), vec![12, 13, 14, 15, 16]);
        assert!(!session.enter_window(99));
    }

    #[test]
    fn test_nested_rebuild_is_deferred() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let session = ReadingSession::open(
            &book(30),
            &ReaderConfig::default(),
            Arc::new(EchoAssembler),
            runtime.handle().clone(),
        )
        .unwrap();

        // Simulate a rebuild in flight on another caller
        let outer = session.guard.scope();
        assert_eq!(session.set_visibility(VisibilitySettings::everything()), None);
        assert_eq!(session.index().visibility(), VisibilitySettings::default());

        // Closing the outer build reports the change made meanwhile
        assert!(outer.finish());
    }
}

//! The buffer lifecycle manager.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::assembler::{AssemblyError, WindowAssembler};
use super::config::BufferConfig;
use super::state::{BufferState, InsertOutcome, PreloadTicket, ShiftOutcome};
use super::stats::{BufferStats, PreloadCounters};
use super::types::{BufferPhase, BufferSnapshot, Position, PreloadHint, WindowContent};
use super::BufferError;
use crate::window::{WindowCalculator, WindowLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftDirection {
    Forward,
    Backward,
}

impl fmt::Display for ShiftDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftDirection::Forward => write!(f, "forward"),
            ShiftDirection::Backward => write!(f, "backward"),
        }
    }
}

/// State shared between the manager and its preload tasks.
struct Shared {
    config: BufferConfig,
    state: Mutex<BufferState>,
    cache: Arc<DashMap<usize, WindowContent>>,
    /// Chapter count preload tasks resolve ranges against.
    chapter_count: AtomicUsize,
    assembler: Arc<dyn WindowAssembler>,
    counters: PreloadCounters,
    snapshot_tx: watch::Sender<BufferSnapshot>,
    active_tx: watch::Sender<Option<usize>>,
    position_tx: watch::Sender<Option<Position>>,
    in_flight_tx: watch::Sender<usize>,
}

/// Decrements the in-flight count when a preload task ends, however it ends.
struct InFlight {
    shared: Arc<Shared>,
}

impl InFlight {
    fn start(shared: &Arc<Shared>) -> Self {
        shared.in_flight_tx.send_modify(|n| *n += 1);
        Self {
            shared: Arc::clone(shared),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.shared
            .in_flight_tx
            .send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Owns the five-window buffer, its cache and the reading position for one
/// open document.
///
/// All mutating operations take the internal lock and never hold it across
/// an await point, so they return quickly even while preloads are running.
/// Queries read published snapshots or the concurrent cache and never wait
/// on the lock.
///
/// # Example
///
/// ```ignore
/// let manager = BufferLifecycleManager::new(
///     BufferConfig::default(),
///     assembler,
///     tokio::runtime::Handle::current(),
/// )?;
/// manager.set_chapter_count(index.visible_chapter_count());
/// manager.initialize(0);
///
/// // Page-change callback from the UI
/// if manager.update_position(chapter, page, pages) == PreloadHint::Forward {
///     manager.shift_forward();
/// }
/// ```
pub struct BufferLifecycleManager {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl fmt::Debug for BufferLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferLifecycleManager")
            .field("config", &self.shared.config)
            .field("snapshot", &*self.shared.snapshot_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl BufferLifecycleManager {
    /// Create a manager for an empty document.
    ///
    /// Preload tasks are spawned on `runtime`. Fails when the configuration
    /// is invalid; a manager is never usable in a broken state.
    pub fn new(
        config: BufferConfig,
        assembler: Arc<dyn WindowAssembler>,
        runtime: Handle,
    ) -> Result<Self, BufferError> {
        config.validate()?;
        let layout = WindowLayout::new(0, config.chapters_per_window)?;

        let cache = Arc::new(DashMap::new());
        let state = BufferState::new(layout, Arc::clone(&cache));
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        let (active_tx, _) = watch::channel(None);
        let (position_tx, _) = watch::channel(None);
        let (in_flight_tx, _) = watch::channel(0);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                cache,
                chapter_count: AtomicUsize::new(0),
                assembler,
                counters: PreloadCounters::default(),
                snapshot_tx,
                active_tx,
                position_tx,
                in_flight_tx,
            }),
            runtime,
        })
    }

    pub fn config(&self) -> &BufferConfig {
        &self.shared.config
    }

    // ==================== Mutating operations ====================

    /// Install the visible chapter count window math runs on.
    ///
    /// Window indices from the previous count are meaningless afterwards, so
    /// this clears the buffer, the cache and the position.
    pub fn set_chapter_count(&self, chapter_count: usize) {
        let mut state = self.shared.state.lock();
        let layout = state.layout().with_chapter_count(chapter_count);
        state.set_layout(layout);
        self.shared
            .chapter_count
            .store(chapter_count, Ordering::Release);
        self.shared.position_tx.send_replace(None);

        info!(
            chapter_count,
            total_windows = layout.window_count(),
            chapters_per_window = layout.chapters_per_window(),
            "Chapter count updated"
        );
        self.publish(&state);
    }

    /// Reset to `Startup` and fill the buffer around `start_window`.
    ///
    /// `start_window` is clamped into the document. The buffer holds up to
    /// [`BUFFER_SIZE`](super::BUFFER_SIZE) consecutive windows starting there,
    /// shifted back when the document end is near. The active window becomes
    /// the first buffered window and every buffered window is preloaded.
    ///
    /// A document without windows leaves the buffer empty and the active
    /// window unset.
    pub fn initialize(&self, start_window: usize) {
        let mut state = self.shared.state.lock();
        let tickets = state.fill(start_window);

        if tickets.is_empty() {
            info!("Buffer initialized empty: document has no windows");
        } else {
            info!(
                start_window,
                windows = ?state.windows(),
                total_windows = state.total_windows(),
                "Buffer initialized"
            );
        }

        for ticket in tickets {
            self.schedule_preload(ticket);
        }
        self.publish(&state);
    }

    /// Record that the reader entered `window_index`.
    ///
    /// # Returns
    ///
    /// `true` if this moved the buffer from `Startup` to `Steady`, which
    /// happens once, when the window at the center slot is entered.
    /// Windows outside the document are ignored.
    pub fn on_entered_window(&self, window_index: usize) -> bool {
        let mut state = self.shared.state.lock();
        let total_windows = state.total_windows();
        if window_index >= total_windows {
            warn!(
                window = window_index,
                total_windows, "Ignoring entry into a window outside the document"
            );
            return false;
        }

        let changed = state.enter(window_index);
        if changed {
            info!(
                window = window_index,
                from = %BufferPhase::Startup,
                to = %BufferPhase::Steady,
                "Buffer phase transition"
            );
        } else {
            debug!(window = window_index, phase = %state.phase(), "Entered window");
        }

        self.publish(&state);
        changed
    }

    /// Slide the buffer one window toward the end of the document.
    ///
    /// Evicts the first window together with its cached content, appends the
    /// next one and schedules its preload. Returns `false` without changing
    /// anything when the buffer is empty or already ends at the last window.
    pub fn shift_forward(&self) -> bool {
        self.shift(ShiftDirection::Forward)
    }

    /// Slide the buffer one window toward the start of the document.
    ///
    /// Mirror image of [`shift_forward`](Self::shift_forward).
    pub fn shift_backward(&self) -> bool {
        self.shift(ShiftDirection::Backward)
    }

    fn shift(&self, direction: ShiftDirection) -> bool {
        let mut state = self.shared.state.lock();
        let outcome: Option<ShiftOutcome> = match direction {
            ShiftDirection::Forward => state.shift_forward(),
            ShiftDirection::Backward => state.shift_backward(),
        };

        let Some(outcome) = outcome else {
            debug!(
                direction = %direction,
                windows = ?state.windows(),
                "Shift refused at document boundary"
            );
            return false;
        };

        debug!(
            direction = %direction,
            evicted = outcome.evicted,
            admitted = outcome.admitted.window,
            active = ?state.active(),
            "Buffer shifted"
        );
        if let Some(active) = outcome.realigned_active {
            debug!(
                evicted = outcome.evicted,
                active, "Active window evicted, pointer moved to nearest buffered window"
            );
        }

        self.schedule_preload(outcome.admitted);
        self.publish(&state);
        true
    }

    /// Record a page change and report whether a preload threshold was
    /// crossed.
    ///
    /// Progress is `in_page_index / total_pages_in_window`, clamped to
    /// `[0, 1]`, and `0.0` when the page total is unknown (zero). This never
    /// shifts the buffer; the caller decides what to do with the hint.
    pub fn update_position(
        &self,
        chapter_index: usize,
        in_page_index: usize,
        total_pages_in_window: usize,
    ) -> PreloadHint {
        let state = self.shared.state.lock();
        let layout = state.layout();
        if chapter_index >= layout.chapter_count() {
            debug!(
                chapter_index,
                chapter_count = layout.chapter_count(),
                "Position reported past the last chapter"
            );
        }

        let progress = if total_pages_in_window == 0 {
            0.0
        } else {
            (in_page_index as f32 / total_pages_in_window as f32).clamp(0.0, 1.0)
        };
        let position = Position {
            window_index: layout.window_for_chapter(chapter_index),
            chapter_index,
            in_page_index,
            progress,
        };
        self.shared.position_tx.send_replace(Some(position));
        drop(state);

        let config = &self.shared.config;
        let hint = if total_pages_in_window == 0 {
            PreloadHint::None
        } else if progress >= config.forward_threshold {
            PreloadHint::Forward
        } else if progress <= config.backward_threshold {
            PreloadHint::Backward
        } else {
            PreloadHint::None
        };

        debug!(
            window = position.window_index,
            chapter = chapter_index,
            page = in_page_index,
            progress,
            hint = %hint,
            "Position updated"
        );
        hint
    }

    /// Drop the buffer, the cache and the position.
    ///
    /// Preloads still running finish but their results are discarded.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.reset();
        self.shared.position_tx.send_replace(None);
        info!("Buffer cleared");
        self.publish(&state);
    }

    // ==================== Queries ====================

    /// Cached content of a window, if preloaded. Never triggers assembly.
    pub fn get_cached_window(&self, window_index: usize) -> Option<WindowContent> {
        self.shared
            .cache
            .get(&window_index)
            .map(|entry| entry.value().clone())
    }

    pub fn is_window_in_buffer(&self, window_index: usize) -> bool {
        self.shared.snapshot_tx.borrow().contains(window_index)
    }

    /// Buffered window indices in order.
    pub fn get_buffered_windows(&self) -> Vec<usize> {
        self.shared.snapshot_tx.borrow().windows.clone()
    }

    pub fn get_active_window_index(&self) -> Option<usize> {
        *self.shared.active_tx.borrow()
    }

    /// Window at the center slot, if the buffer holds more than
    /// [`CENTER_POS`](super::CENTER_POS) windows.
    pub fn get_center_window_index(&self) -> Option<usize> {
        self.shared.snapshot_tx.borrow().center()
    }

    pub fn phase(&self) -> BufferPhase {
        self.shared.snapshot_tx.borrow().phase
    }

    pub fn total_windows(&self) -> usize {
        self.shared.snapshot_tx.borrow().total_windows
    }

    pub fn chapter_count(&self) -> usize {
        self.shared.chapter_count.load(Ordering::Acquire)
    }

    pub fn current_position(&self) -> Option<Position> {
        *self.shared.position_tx.borrow()
    }

    /// Full buffer snapshot.
    pub fn snapshot(&self) -> BufferSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    pub fn stats(&self) -> BufferStats {
        let in_flight = *self.shared.in_flight_tx.borrow();
        self.shared
            .counters
            .snapshot(in_flight, self.shared.cache.len())
    }

    // ==================== Observation ====================

    /// Watch the active window. The receiver starts with the current value.
    pub fn subscribe_active_window(&self) -> watch::Receiver<Option<usize>> {
        self.shared.active_tx.subscribe()
    }

    /// Watch the reading position. The receiver starts with the current value.
    pub fn subscribe_position(&self) -> watch::Receiver<Option<Position>> {
        self.shared.position_tx.subscribe()
    }

    /// Watch buffer snapshots (phase, windows, active window).
    pub fn subscribe_buffer(&self) -> watch::Receiver<BufferSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Wait until no preload is running.
    pub async fn wait_for_preloads(&self) {
        let mut in_flight = self.shared.in_flight_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = in_flight.wait_for(|n| *n == 0).await;
    }

    // ==================== Internals ====================

    /// Publish the buffer state to watchers. Called with the lock held so
    /// published snapshots follow mutation order.
    fn publish(&self, state: &BufferState) {
        let snapshot = state.snapshot();
        let active = snapshot.active_window;

        self.shared.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
        self.shared.active_tx.send_if_modified(|current| {
            if *current == active {
                return false;
            }
            *current = active;
            true
        });
    }

    /// Spawn a fire-and-forget preload for an admitted window.
    fn schedule_preload(&self, ticket: PreloadTicket) {
        if self.shared.cache.contains_key(&ticket.window) {
            debug!(window = ticket.window, "Window already cached, skipping preload");
            return;
        }

        self.shared.counters.record_scheduled();
        let in_flight = InFlight::start(&self.shared);
        let shared = Arc::clone(&self.shared);

        debug!(
            window = ticket.window,
            generation = ticket.generation,
            "Preload scheduled"
        );
        self.runtime.spawn(async move {
            let _in_flight = in_flight;
            preload(shared, ticket).await;
        });
    }
}

/// Assemble one window and insert it if its slot is still current.
async fn preload(shared: Arc<Shared>, ticket: PreloadTicket) {
    let window = ticket.window;
    let chapter_count = shared.chapter_count.load(Ordering::Acquire);

    let range = match WindowCalculator::window_range(
        window,
        chapter_count,
        shared.config.chapters_per_window,
    ) {
        Ok(Some(range)) => range,
        Ok(None) => {
            warn!(
                window,
                chapter_count, "Preload aborted: window has no chapter range"
            );
            shared.counters.record_invalid_range();
            return;
        }
        Err(e) => {
            warn!(window, error = %e, "Preload aborted: invalid window arguments");
            shared.counters.record_invalid_range();
            return;
        }
    };

    let started = Instant::now();
    let result = shared.assembler.assemble_window(range).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let content = match result {
        Ok(content) if content.is_empty() => {
            warn!(window, elapsed_ms, error = %AssemblyError::Empty, "Window not cached");
            shared.counters.record_failed();
            return;
        }
        Ok(content) if content.window_index() != window => {
            warn!(
                window,
                returned = content.window_index(),
                "Window assembly returned content for another window"
            );
            shared.counters.record_failed();
            return;
        }
        Ok(content) => content,
        Err(e) => {
            warn!(window, elapsed_ms, error = %e, "Window assembly failed");
            shared.counters.record_failed();
            return;
        }
    };

    let outcome = shared.state.lock().insert_content(ticket, content);
    match outcome {
        InsertOutcome::Inserted => {
            shared.counters.record_completed();
            debug!(
                window,
                first_chapter = range.first_chapter,
                last_chapter = range.last_chapter,
                elapsed_ms,
                "Window preloaded"
            );
        }
        InsertOutcome::Stale => {
            shared.counters.record_stale();
            debug!(
                window,
                generation = ticket.generation,
                "Discarded preload for a window no longer buffered"
            );
        }
    }
}

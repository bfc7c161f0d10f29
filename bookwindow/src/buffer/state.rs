//! Buffer state: window slots and their cache, owned as one unit.
//!
//! Every mutation of the slot list that drops a window also drops its cache
//! entry inside the same method, and cache inserts go through
//! [`BufferState::insert_content`], which checks the slot first. With the
//! state behind a single mutex this keeps `cache ⊆ buffer` whenever the lock
//! is free.
//!
//! # Generations
//!
//! Each slot is stamped with a generation when its window is admitted. The
//! counter only grows, so a window that is evicted and later re-admitted gets
//! a new stamp. Preload results carry the stamp they were started for and are
//! accepted only if the slot still holds it.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;

use super::{BufferPhase, BufferSnapshot, WindowContent, BUFFER_SIZE, CENTER_POS};
use crate::window::WindowLayout;

/// A window admitted to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BufferSlot {
    pub(crate) window: usize,
    pub(crate) generation: u64,
}

/// Identifies one preload: the window and the generation it was started for.
pub(crate) type PreloadTicket = BufferSlot;

/// Result of a successful shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShiftOutcome {
    pub(crate) evicted: usize,
    pub(crate) admitted: PreloadTicket,
    /// Set when the active window was evicted and the pointer moved.
    pub(crate) realigned_active: Option<usize>,
}

/// Outcome of inserting preloaded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertOutcome {
    Inserted,
    Stale,
}

#[derive(Debug)]
pub(crate) struct BufferState {
    phase: BufferPhase,
    slots: VecDeque<BufferSlot>,
    cache: Arc<DashMap<usize, WindowContent>>,
    active: Option<usize>,
    layout: WindowLayout,
    next_generation: u64,
}

impl BufferState {
    pub(crate) fn new(layout: WindowLayout, cache: Arc<DashMap<usize, WindowContent>>) -> Self {
        Self {
            phase: BufferPhase::Startup,
            slots: VecDeque::with_capacity(BUFFER_SIZE),
            cache,
            active: None,
            layout,
            next_generation: 0,
        }
    }

    pub(crate) fn layout(&self) -> WindowLayout {
        self.layout
    }

    pub(crate) fn phase(&self) -> BufferPhase {
        self.phase
    }

    pub(crate) fn active(&self) -> Option<usize> {
        self.active
    }

    pub(crate) fn total_windows(&self) -> usize {
        self.layout.window_count()
    }

    pub(crate) fn windows(&self) -> Vec<usize> {
        self.slots.iter().map(|slot| slot.window).collect()
    }

    pub(crate) fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            phase: self.phase,
            windows: self.windows(),
            active_window: self.active,
            total_windows: self.total_windows(),
        }
    }

    /// Drop every slot and cache entry and return to `Startup`.
    pub(crate) fn reset(&mut self) {
        self.phase = BufferPhase::Startup;
        self.slots.clear();
        self.cache.clear();
        self.active = None;
    }

    /// Install a new layout. Existing windows are meaningless under it, so
    /// the buffer is reset as well.
    pub(crate) fn set_layout(&mut self, layout: WindowLayout) {
        self.reset();
        self.layout = layout;
    }

    fn admit(&mut self, window: usize) -> BufferSlot {
        let slot = BufferSlot {
            window,
            generation: self.next_generation,
        };
        self.next_generation += 1;
        slot
    }

    /// Reset and fill with up to [`BUFFER_SIZE`] consecutive windows around
    /// `start_window`, shifted to stay inside the document.
    ///
    /// Returns the admitted slots, first to last. Empty for a document with
    /// no windows.
    pub(crate) fn fill(&mut self, start_window: usize) -> Vec<PreloadTicket> {
        self.reset();

        let Some(max_index) = self.layout.last_window() else {
            return Vec::new();
        };

        let start = start_window.min(max_index);
        let end = (start + BUFFER_SIZE - 1).min(max_index);
        let actual_start = (end + 1).saturating_sub(BUFFER_SIZE);

        for window in actual_start..=end {
            let slot = self.admit(window);
            self.slots.push_back(slot);
        }
        self.active = self.slots.front().map(|slot| slot.window);

        self.slots.iter().copied().collect()
    }

    /// Record the reader entering `window`.
    ///
    /// Returns `true` when this flips the phase to `Steady`.
    pub(crate) fn enter(&mut self, window: usize) -> bool {
        self.active = Some(window);

        let at_center = self.slots.get(CENTER_POS).map(|slot| slot.window) == Some(window);
        if self.phase == BufferPhase::Startup && at_center {
            self.phase = BufferPhase::Steady;
            return true;
        }
        false
    }

    /// Slide one window toward the end of the document.
    pub(crate) fn shift_forward(&mut self) -> Option<ShiftOutcome> {
        let last = self.slots.back()?.window;
        let next = last + 1;
        if next >= self.total_windows() {
            return None;
        }

        let evicted = self.evict_front()?;
        let admitted = self.admit(next);
        self.slots.push_back(admitted);

        let realigned_active = self.realign_active(evicted, self.slots.front().copied());
        Some(ShiftOutcome {
            evicted,
            admitted,
            realigned_active,
        })
    }

    /// Slide one window toward the start of the document.
    pub(crate) fn shift_backward(&mut self) -> Option<ShiftOutcome> {
        let first = self.slots.front()?.window;
        let previous = first.checked_sub(1)?;

        let evicted = self.evict_back()?;
        let admitted = self.admit(previous);
        self.slots.push_front(admitted);

        let realigned_active = self.realign_active(evicted, self.slots.back().copied());
        Some(ShiftOutcome {
            evicted,
            admitted,
            realigned_active,
        })
    }

    fn evict_front(&mut self) -> Option<usize> {
        let slot = self.slots.pop_front()?;
        self.cache.remove(&slot.window);
        Some(slot.window)
    }

    fn evict_back(&mut self) -> Option<usize> {
        let slot = self.slots.pop_back()?;
        self.cache.remove(&slot.window);
        Some(slot.window)
    }

    /// Keep the active pointer off an evicted window by moving it to the
    /// nearest buffered one.
    fn realign_active(&mut self, evicted: usize, nearest: Option<BufferSlot>) -> Option<usize> {
        if self.active != Some(evicted) {
            return None;
        }
        self.active = nearest.map(|slot| slot.window);
        self.active
    }

    /// Whether a preload started for `ticket` is still wanted.
    pub(crate) fn accepts(&self, ticket: PreloadTicket) -> bool {
        self.slots.iter().any(|slot| *slot == ticket)
    }

    /// Insert preloaded content if its slot is still current.
    pub(crate) fn insert_content(
        &mut self,
        ticket: PreloadTicket,
        content: WindowContent,
    ) -> InsertOutcome {
        if !self.accepts(ticket) {
            return InsertOutcome::Stale;
        }
        self.cache.insert(ticket.window, content);
        InsertOutcome::Inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(chapters: usize) -> BufferState {
        BufferState::new(
            WindowLayout::new(chapters, 5).unwrap(),
            Arc::new(DashMap::new()),
        )
    }

    fn cache_keys(state: &BufferState) -> Vec<usize> {
        let mut keys: Vec<_> = state.cache.iter().map(|e| *e.key()).collect();
        keys.sort_unstable();
        keys
    }

    fn fill_cache(state: &mut BufferState, tickets: &[PreloadTicket]) {
        for ticket in tickets {
            let content = WindowContent::new(ticket.window, "x");
            assert_eq!(
                state.insert_content(*ticket, content),
                InsertOutcome::Inserted
            );
        }
    }

    #[test]
    fn test_fill_from_start() {
        let mut state = state(110); // 22 windows
        let tickets = state.fill(0);
        assert_eq!(state.windows(), vec![0, 1, 2, 3, 4]);
        assert_eq!(tickets.len(), 5);
        assert_eq!(state.active(), Some(0));
        assert_eq!(state.phase(), BufferPhase::Startup);
    }

    #[test]
    fn test_fill_near_end_shifts_back() {
        let mut state = state(110);
        state.fill(20);
        assert_eq!(state.windows(), vec![17, 18, 19, 20, 21]);
        assert_eq!(state.active(), Some(17));
    }

    #[test]
    fn test_fill_clamps_start() {
        let mut state = state(110);
        state.fill(500);
        assert_eq!(state.windows(), vec![17, 18, 19, 20, 21]);
    }

    #[test]
    fn test_fill_short_document() {
        let mut state = state(12); // 3 windows
        state.fill(1);
        assert_eq!(state.windows(), vec![0, 1, 2]);
    }

    #[test]
    fn test_fill_empty_document() {
        let mut state = state(0);
        let tickets = state.fill(0);
        assert!(tickets.is_empty());
        assert!(state.windows().is_empty());
        assert_eq!(state.active(), None);
    }

    #[test]
    fn test_enter_center_flips_phase_once() {
        let mut state = state(110);
        state.fill(0);
        assert!(!state.enter(1));
        assert!(state.enter(2));
        assert_eq!(state.phase(), BufferPhase::Steady);
        assert!(!state.enter(2));
        assert!(!state.enter(0));
        assert_eq!(state.phase(), BufferPhase::Steady);
    }

    #[test]
    fn test_shift_forward_evicts_front_and_its_cache() {
        let mut state = state(110);
        let tickets = state.fill(0);
        fill_cache(&mut state, &tickets);

        let outcome = state.shift_forward().unwrap();
        assert_eq!(outcome.evicted, 0);
        assert_eq!(outcome.admitted.window, 5);
        assert_eq!(state.windows(), vec![1, 2, 3, 4, 5]);
        assert_eq!(cache_keys(&state), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_shift_backward_evicts_back_and_its_cache() {
        let mut state = state(110);
        let tickets = state.fill(10);
        fill_cache(&mut state, &tickets);

        let outcome = state.shift_backward().unwrap();
        assert_eq!(outcome.evicted, 14);
        assert_eq!(outcome.admitted.window, 9);
        assert_eq!(state.windows(), vec![9, 10, 11, 12, 13]);
        assert_eq!(cache_keys(&state), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_shift_at_boundaries() {
        let mut state = state(110);
        state.fill(0);
        assert!(state.shift_backward().is_none());
        assert_eq!(state.windows(), vec![0, 1, 2, 3, 4]);

        state.fill(21);
        assert!(state.shift_forward().is_none());
        assert_eq!(state.windows(), vec![17, 18, 19, 20, 21]);
    }

    #[test]
    fn test_shift_on_empty_buffer() {
        let mut state = state(110);
        assert!(state.shift_forward().is_none());
        assert!(state.shift_backward().is_none());
    }

    #[test]
    fn test_active_untouched_when_not_evicted() {
        let mut state = state(110);
        state.fill(0);
        state.enter(2);
        let outcome = state.shift_forward().unwrap();
        assert_eq!(outcome.realigned_active, None);
        assert_eq!(state.active(), Some(2));
    }

    #[test]
    fn test_active_realigned_when_evicted() {
        let mut state = state(110);
        state.fill(0);
        // active is window 0, which a forward shift evicts
        let outcome = state.shift_forward().unwrap();
        assert_eq!(outcome.realigned_active, Some(1));
        assert_eq!(state.active(), Some(1));

        state.enter(5);
        let outcome = state.shift_backward().unwrap();
        assert_eq!(outcome.realigned_active, Some(4));
        assert_eq!(state.active(), Some(4));
    }

    #[test]
    fn test_stale_ticket_rejected() {
        let mut state = state(110);
        let tickets = state.fill(0);
        state.shift_forward();

        let stale = tickets[0];
        assert!(!state.accepts(stale));
        assert_eq!(
            state.insert_content(stale, WindowContent::new(0, "late")),
            InsertOutcome::Stale
        );
        assert!(cache_keys(&state).is_empty());
    }

    #[test]
    fn test_readmitted_window_gets_new_generation() {
        let mut state = state(110);
        let tickets = state.fill(0);
        state.shift_forward(); // evicts 0
        let outcome = state.shift_backward().unwrap(); // re-admits 0
        assert_eq!(outcome.admitted.window, 0);
        assert_ne!(outcome.admitted.generation, tickets[0].generation);
        assert!(!state.accepts(tickets[0]));
        assert!(state.accepts(outcome.admitted));
    }

    #[test]
    fn test_refill_invalidates_old_tickets() {
        let mut state = state(110);
        let first = state.fill(0);
        let second = state.fill(0);
        assert!(!state.accepts(first[1]));
        assert!(state.accepts(second[1]));
    }

    #[test]
    fn test_set_layout_resets() {
        let mut state = state(110);
        let tickets = state.fill(0);
        fill_cache(&mut state, &tickets);
        state.enter(2);

        state.set_layout(WindowLayout::new(7, 5).unwrap());
        assert!(state.windows().is_empty());
        assert!(cache_keys(&state).is_empty());
        assert_eq!(state.phase(), BufferPhase::Startup);
        assert_eq!(state.total_windows(), 2);
    }
}

//! Preload statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free preload counters kept by the buffer manager.
#[derive(Debug, Default)]
pub(crate) struct PreloadCounters {
    scheduled: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    stale: AtomicU64,
    invalid_range: AtomicU64,
}

impl PreloadCounters {
    pub(crate) fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalid_range(&self) {
        self.invalid_range.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, in_flight: usize, cached: usize) -> BufferStats {
        BufferStats {
            preloads_scheduled: self.scheduled.load(Ordering::Relaxed),
            preloads_completed: self.completed.load(Ordering::Relaxed),
            preloads_failed: self.failed.load(Ordering::Relaxed),
            stale_discarded: self.stale.load(Ordering::Relaxed),
            invalid_ranges: self.invalid_range.load(Ordering::Relaxed),
            in_flight,
            cached_windows: cached,
        }
    }
}

/// Snapshot of buffer manager statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferStats {
    /// Preload tasks spawned.
    pub preloads_scheduled: u64,
    /// Preloads whose result was inserted into the cache.
    pub preloads_completed: u64,
    /// Preloads where the assembler failed or returned nothing.
    pub preloads_failed: u64,
    /// Results discarded because the window left the buffer first.
    pub stale_discarded: u64,
    /// Preloads aborted because the window no longer had a chapter range.
    pub invalid_ranges: u64,
    /// Preload tasks currently running.
    pub in_flight: usize,
    /// Windows currently cached.
    pub cached_windows: usize,
}

impl BufferStats {
    /// Preloads that have finished one way or another.
    pub fn preloads_finished(&self) -> u64 {
        self.preloads_completed + self.preloads_failed + self.stale_discarded + self.invalid_ranges
    }
}

impl fmt::Display for BufferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "preloads: {} scheduled, {} completed, {} failed, {} stale, {} invalid, {} in flight; {} cached",
            self.preloads_scheduled,
            self.preloads_completed,
            self.preloads_failed,
            self.stale_discarded,
            self.invalid_ranges,
            self.in_flight,
            self.cached_windows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = PreloadCounters::default();
        counters.record_scheduled();
        counters.record_scheduled();
        counters.record_scheduled();
        counters.record_completed();
        counters.record_failed();
        counters.record_stale();

        let stats = counters.snapshot(0, 1);
        assert_eq!(stats.preloads_scheduled, 3);
        assert_eq!(stats.preloads_completed, 1);
        assert_eq!(stats.preloads_failed, 1);
        assert_eq!(stats.stale_discarded, 1);
        assert_eq!(stats.invalid_ranges, 0);
        assert_eq!(stats.preloads_finished(), 3);
        assert_eq!(stats.cached_windows, 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = BufferStats {
            preloads_scheduled: 6,
            preloads_completed: 5,
            stale_discarded: 1,
            cached_windows: 5,
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("6 scheduled"));
        assert!(text.contains("1 stale"));
        assert!(text.contains("5 cached"));
    }
}

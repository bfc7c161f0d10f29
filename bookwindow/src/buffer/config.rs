//! Buffer manager configuration.

use std::time::Duration;

use crate::window::DEFAULT_CHAPTERS_PER_WINDOW;

use super::BufferError;

// ==================== Buffer Defaults ====================

/// Default progress at which a forward shift is suggested.
pub const DEFAULT_FORWARD_THRESHOLD: f32 = 0.75;

/// Default progress at which a backward shift is suggested.
pub const DEFAULT_BACKWARD_THRESHOLD: f32 = 0.25;

/// Default time limit for assembling one window, in seconds.
///
/// The manager itself never times out an assembly; this bounds the
/// [`TimeoutAssembler`](super::TimeoutAssembler) wrapped around it.
pub const DEFAULT_ASSEMBLY_TIMEOUT_SECS: u64 = 10;

/// Configuration for [`BufferLifecycleManager`](super::BufferLifecycleManager).
#[derive(Debug, Clone, PartialEq)]
pub struct BufferConfig {
    /// Chapters bundled into each window. Must be non-zero.
    pub chapters_per_window: usize,

    /// Window progress at or above which a forward shift is suggested.
    ///
    /// Default: 0.75.
    pub forward_threshold: f32,

    /// Window progress at or below which a backward shift is suggested.
    ///
    /// Default: 0.25.
    pub backward_threshold: f32,

    /// Time limit for one window assembly.
    ///
    /// Default: 10 seconds.
    pub assembly_timeout: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            chapters_per_window: DEFAULT_CHAPTERS_PER_WINDOW,
            forward_threshold: DEFAULT_FORWARD_THRESHOLD,
            backward_threshold: DEFAULT_BACKWARD_THRESHOLD,
            assembly_timeout: Duration::from_secs(DEFAULT_ASSEMBLY_TIMEOUT_SECS),
        }
    }
}

impl BufferConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chapters_per_window(mut self, chapters_per_window: usize) -> Self {
        self.chapters_per_window = chapters_per_window;
        self
    }

    pub fn with_thresholds(mut self, backward: f32, forward: f32) -> Self {
        self.backward_threshold = backward;
        self.forward_threshold = forward;
        self
    }

    pub fn with_assembly_timeout(mut self, timeout: Duration) -> Self {
        self.assembly_timeout = timeout;
        self
    }

    /// Check the configuration.
    ///
    /// Requires a non-zero window size and `0 <= backward < forward <= 1`.
    pub fn validate(&self) -> Result<(), BufferError> {
        if self.chapters_per_window == 0 {
            return Err(BufferError::InvalidConfig(
                "chapters_per_window must be greater than zero".to_string(),
            ));
        }
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.forward_threshold) || !in_unit(self.backward_threshold) {
            return Err(BufferError::InvalidConfig(format!(
                "thresholds must lie in [0, 1] (backward {}, forward {})",
                self.backward_threshold, self.forward_threshold
            )));
        }
        if self.backward_threshold >= self.forward_threshold {
            return Err(BufferError::InvalidConfig(format!(
                "backward threshold {} must be below forward threshold {}",
                self.backward_threshold, self.forward_threshold
            )));
        }
        if self.assembly_timeout.is_zero() {
            return Err(BufferError::InvalidConfig(
                "assembly timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

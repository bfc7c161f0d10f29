//! Five-window sliding buffer with background preload.
//!
//! The [`BufferLifecycleManager`] keeps at most [`BUFFER_SIZE`] consecutive
//! windows "in play", caches their assembled content, tracks the reader's
//! position and asks a [`WindowAssembler`] to build windows ahead of time.
//!
//! # Lifecycle
//!
//! ```text
//!            initialize(start)
//!                  │
//!                  ▼
//!   ┌──────────────────────────┐  on_entered_window(buffer[CENTER_POS])
//!   │ Startup                  │ ───────────────────────────────────┐
//!   │ buffer filled, preloading│                                    │
//!   └──────────────────────────┘                                    ▼
//!                                        ┌──────────────────────────────┐
//!                                        │ Steady                       │
//!                                        │ shift_forward/shift_backward │
//!                                        └──────────────────────────────┘
//!                  clear() / set_chapter_count() return to an empty Startup
//! ```
//!
//! `Steady` never reverts to `Startup` within one lifecycle.
//!
//! # Concurrency
//!
//! - Mutating operations are serialized by one mutex around the buffer state.
//! - The cache is a `DashMap`; cache reads never take the buffer lock.
//! - Preloads run as spawned tasks outside the lock and re-take it only to
//!   insert, after checking that the slot generation they were started for
//!   is still buffered.

mod assembler;
mod config;
mod manager;
mod state;
mod stats;
mod types;

pub use assembler::{AssemblyError, BoxFuture, TimeoutAssembler, WindowAssembler};
pub use config::{
    BufferConfig, DEFAULT_ASSEMBLY_TIMEOUT_SECS, DEFAULT_BACKWARD_THRESHOLD,
    DEFAULT_FORWARD_THRESHOLD,
};
pub use manager::BufferLifecycleManager;
pub use stats::BufferStats;
pub use types::{BufferPhase, BufferSnapshot, Position, PreloadHint, WindowContent};

use thiserror::Error;

use crate::window::WindowError;

/// Maximum number of windows held in the buffer.
pub const BUFFER_SIZE: usize = 5;

/// Slot whose window flips the buffer from `Startup` to `Steady`.
pub const CENTER_POS: usize = 2;

/// Errors raised while constructing or configuring a buffer manager.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The configuration cannot produce a working manager.
    #[error("Invalid buffer configuration: {0}")]
    InvalidConfig(String),

    /// Window math rejected an argument.
    #[error(transparent)]
    Window(#[from] WindowError),
}

//! Bookwindow - windowed pagination core for long-form readers
//!
//! A long document is split into *windows*, fixed-size groups of visible
//! chapters. Only five consecutive windows are kept "in play" at a time:
//! their content is assembled in the background and cached, and the buffer
//! slides as the reader moves.
//!
//! - [`chapter`]: chapter roles, visibility and the raw⇄visible index
//! - [`window`]: window count and chapter range math
//! - [`buffer`]: the five-window buffer and its preload lifecycle
//! - [`guard`]: reentrant build guard with configuration drift detection
//! - [`session`]: one open document tying the pieces together
//! - [`config`], [`logging`]: INI configuration and tracing setup

pub mod buffer;
pub mod chapter;
pub mod config;
pub mod guard;
pub mod logging;
pub mod session;
pub mod window;

pub use buffer::{
    AssemblyError, BufferConfig, BufferError, BufferLifecycleManager, BufferPhase,
    BufferSnapshot, BufferStats, Position, PreloadHint, WindowAssembler, WindowContent,
    BUFFER_SIZE, CENTER_POS,
};
pub use chapter::{Chapter, ChapterClassifier, ChapterRole, IndexProvider, VisibilitySettings};
pub use guard::ConcurrencyGuard;
pub use session::{ReadingSession, SessionError};
pub use window::{WindowCalculator, WindowError, WindowLayout, WindowRange};

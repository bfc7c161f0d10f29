//! Window arithmetic.
//!
//! A *window* is a contiguous run of chapters rendered and cached as one unit.
//! Everything in this module is pure: the same chapter count and window size
//! always produce the same windows, and nothing here holds mutable state, so
//! it is safe to call from any thread without synchronization.
//!
//! # Layout
//!
//! ```text
//! chapters:  0 1 2 3 4 | 5 6 7 8 9 | ... | 20 21
//! windows:   [    0    ] [    1    ]  ...  [ 4 ]
//! ```
//!
//! Every window holds exactly `chapters_per_window` chapters except the last,
//! which may be short.
//!
//! Two entry points are provided:
//!
//! - [`WindowCalculator`] - free-standing functions that validate their
//!   arguments on every call
//! - [`WindowLayout`] - a validated `(chapter_count, chapters_per_window)` pair
//!   whose methods cannot fail once constructed

mod calculator;
mod layout;

pub use calculator::{WindowCalculator, WindowError, WindowRange};
pub use layout::WindowLayout;

/// Default number of chapters bundled into one window.
pub const DEFAULT_CHAPTERS_PER_WINDOW: usize = 5;

//! Reentrant build guard with configuration drift detection.
//!
//! Callers that recompute the window count and then publish a dependent list
//! wrap the sequence in a *build*. The guard serializes builds and takes a
//! snapshot of the shared configuration when the outermost build begins; when
//! it ends, the snapshot is compared with the current value. A difference means
//! somebody changed the configuration while the build was in flight. That is
//! reported and logged, never raised as an error.
//!
//! # State Machine
//!
//! ```text
//! Idle --begin_build--> Building(depth=1, snapshot)
//! Building(n) --begin_build--> Building(n+1)       (nested, rejected)
//! Building(n>1) --end_build--> Building(n-1)
//! Building(1) --end_build--> Idle                  (drift check)
//! ```
//!
//! Depth and snapshot live under one mutex, so there is no check-then-act gap
//! between reading the depth and updating it.

use std::fmt::Debug;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Internal guard state.
#[derive(Debug)]
enum GuardState<T> {
    Idle,
    Building { depth: usize, snapshot: T },
}

/// Reentrant guard around "recompute and publish" sequences.
///
/// `T` is the configuration value whose drift is monitored; it is read
/// through the source closure given at construction.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::RwLock;
/// use bookwindow::guard::ConcurrencyGuard;
///
/// let mode = Arc::new(RwLock::new(5usize));
/// let source = Arc::clone(&mode);
/// let guard = ConcurrencyGuard::new(move || *source.read());
///
/// assert!(guard.begin_build());
/// *mode.write() = 3; // concurrent change
/// assert!(guard.end_build()); // drift detected
/// ```
pub struct ConcurrencyGuard<T> {
    state: Mutex<GuardState<T>>,
    source: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T> std::fmt::Debug for ConcurrencyGuard<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGuard")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T> ConcurrencyGuard<T>
where
    T: Clone + PartialEq + Debug,
{
    /// Create a guard reading the monitored value from `source`.
    pub fn new(source: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(GuardState::Idle),
            source: Box::new(source),
        }
    }

    /// Begin a build.
    ///
    /// # Returns
    ///
    /// `true` for the outermost build, which owns the critical section.
    /// Nested calls return `false` but still must be balanced by a matching
    /// [`end_build`](Self::end_build).
    pub fn begin_build(&self) -> bool {
        let mut state = self.state.lock();
        if let GuardState::Building { depth, .. } = &mut *state {
            *depth += 1;
            debug!(depth = *depth, "Nested build rejected");
            return false;
        }

        let snapshot = (self.source)();
        debug!(snapshot = ?snapshot, "Build started");
        *state = GuardState::Building { depth: 1, snapshot };
        true
    }

    /// End a build.
    ///
    /// # Returns
    ///
    /// `true` when the outermost build finished and the monitored value no
    /// longer matches the snapshot taken at [`begin_build`](Self::begin_build).
    /// Nested ends and unbalanced calls return `false`.
    pub fn end_build(&self) -> bool {
        let mut state = self.state.lock();
        match &mut *state {
            GuardState::Idle => {
                warn!("end_build called without a matching begin_build");
                return false;
            }
            GuardState::Building { depth, .. } if *depth > 1 => {
                *depth -= 1;
                return false;
            }
            GuardState::Building { .. } => {}
        }

        let GuardState::Building { snapshot, .. } =
            std::mem::replace(&mut *state, GuardState::Idle)
        else {
            return false;
        };

        let current = (self.source)();
        if current != snapshot {
            warn!(
                before = ?snapshot,
                after = ?current,
                "Configuration changed during an in-flight build"
            );
            true
        } else {
            debug!("Build finished");
            false
        }
    }

    /// Begin a build that ends when the returned scope is dropped.
    pub fn scope(&self) -> BuildScope<'_, T> {
        let outermost = self.begin_build();
        BuildScope {
            guard: self,
            outermost,
            finished: false,
        }
    }

    /// Current nesting depth (0 when idle).
    pub fn depth(&self) -> usize {
        match &*self.state.lock() {
            GuardState::Idle => 0,
            GuardState::Building { depth, .. } => *depth,
        }
    }

    pub fn is_building(&self) -> bool {
        self.depth() > 0
    }
}

/// RAII build scope returned by [`ConcurrencyGuard::scope`].
pub struct BuildScope<'a, T>
where
    T: Clone + PartialEq + Debug,
{
    guard: &'a ConcurrencyGuard<T>,
    outermost: bool,
    finished: bool,
}

impl<T> BuildScope<'_, T>
where
    T: Clone + PartialEq + Debug,
{
    /// Whether this scope owns the critical section.
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }

    /// End the build now and report drift.
    pub fn finish(mut self) -> bool {
        self.finished = true;
        self.guard.end_build()
    }
}

impl<T> Drop for BuildScope<'_, T>
where
    T: Clone + PartialEq + Debug,
{
    fn drop(&mut self) {
        if !self.finished {
            self.guard.end_build();
        }
    }
}

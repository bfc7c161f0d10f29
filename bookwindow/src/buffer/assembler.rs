//! Window assembly interface.
//!
//! Turning a range of chapters into displayable content (markup, styling,
//! pagination) happens outside this crate. The buffer manager only needs
//! something that implements [`WindowAssembler`]; it calls it from background
//! tasks, possibly for several windows at once.
//!
//! # Dyn Compatibility
//!
//! The trait returns a boxed future so it can be used as
//! `Arc<dyn WindowAssembler>`, which lets decorators such as
//! [`TimeoutAssembler`] wrap any implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::WindowContent;
use crate::window::WindowRange;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported by a window assembler.
///
/// None of these are fatal to the buffer manager: the window's cache slot
/// simply stays empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// The assembler could not produce the window.
    #[error("Assembly failed: {0}")]
    Failed(String),

    /// The assembler produced no content.
    #[error("Assembler returned empty content")]
    Empty,

    /// The assembler did not finish in time.
    #[error("Assembly timed out after {0:?}")]
    Timeout(Duration),
}

/// Materializes the content of one window.
///
/// # Thread Safety
///
/// Implementations must be safe to call concurrently for different windows.
/// They should bound their own running time (see [`TimeoutAssembler`]) and
/// report failure rather than hang.
pub trait WindowAssembler: Send + Sync + 'static {
    /// Assemble the chapters `range.first_chapter..=range.last_chapter` as
    /// window `range.window_index`.
    fn assemble_window(&self, range: WindowRange)
        -> BoxFuture<'_, Result<WindowContent, AssemblyError>>;
}

impl<T: WindowAssembler + ?Sized> WindowAssembler for Arc<T> {
    fn assemble_window(
        &self,
        range: WindowRange,
    ) -> BoxFuture<'_, Result<WindowContent, AssemblyError>> {
        (**self).assemble_window(range)
    }
}

/// Decorator that bounds every assembly with a time limit.
///
/// # Example
///
/// ```ignore
/// let assembler = TimeoutAssembler::new(Arc::new(renderer), Duration::from_secs(10));
/// ```
pub struct TimeoutAssembler {
    inner: Arc<dyn WindowAssembler>,
    timeout: Duration,
}

impl TimeoutAssembler {
    pub fn new(inner: Arc<dyn WindowAssembler>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl WindowAssembler for TimeoutAssembler {
    fn assemble_window(
        &self,
        range: WindowRange,
    ) -> BoxFuture<'_, Result<WindowContent, AssemblyError>> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, self.inner.assemble_window(range)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        window = range.window_index,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Window assembly timed out"
                    );
                    Err(AssemblyError::Timeout(self.timeout))
                }
            }
        })
    }
}

//! Hand-off point between the event loop and the blocking worker pool.
//!
//! Every blocking storage call in this crate crosses a [`Bridge`]: the call
//! runs on one of the runtime's blocking workers while the submitting task
//! suspends, and the task resumes with the call's own result or error.

use tokio::runtime::Handle;

use crate::core::{DbError, Result};

/// Dispatches blocking closures onto a runtime's blocking worker pool.
///
/// The target runtime is supplied at construction and shared by clones,
/// like the [`Engine`] it usually travels with.
///
/// Each [`dispatch`] submits its closure exactly once, occupies one worker
/// slot for the closure's duration, and imposes no timeout and no ordering
/// between calls beyond each call's own completion. If the awaiting future
/// is dropped, the worker still runs the closure to completion and its
/// result is discarded.
///
/// [`Engine`]: crate::engine::Engine
/// [`dispatch`]: Bridge::dispatch
///
/// # Examples
///
/// ```
/// # #[tokio::main]
/// # async fn main() -> sqlbridge::Result<()> {
/// let bridge = sqlbridge::Bridge::current();
/// let answer = bridge.dispatch(|| Ok(6 * 7)).await?;
/// assert_eq!(answer, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Bridge {
    handle: Handle,
}

impl Bridge {
    /// Create a bridge onto the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create a bridge onto the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like
    /// [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// The runtime this bridge submits to.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Run `job` on a blocking worker and resume with its result.
    ///
    /// The job's own error crosses the bridge unchanged. A job that panics,
    /// or a pool that can no longer deliver the result, surfaces as
    /// [`DbError::Worker`].
    pub async fn dispatch<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        match self.handle.spawn_blocking(job).await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(DbError::Worker(join_err.to_string())),
        }
    }
}

//! Cooperative cancellation.

use crate::error::{IndexError, IndexResult};
use tokio_util::sync::CancellationToken;

/// Poll-style cancellation token threaded through a rebuild pass.
///
/// Cancellation is cooperative, never preemptive: the traversal calls
/// [`check`](Self::check) at least once per coordinate and once per asset,
/// and aborts with [`IndexError::Cancelled`] at the next check after
/// [`cancel`](Self::cancel) was called.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the pass's next check.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Raise [`IndexError::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> IndexResult<()> {
        if self.inner.is_cancelled() {
            Err(IndexError::Cancelled)
        } else {
            Ok(())
        }
    }
}

//! Session-scoped cancellation (spec §5: "Each suspension MUST be
//! cancellable via a session-scoped cancel token; cancellation propagates to
//! in-flight model calls and to MCTS iteration loops (checked between
//! iterations)").
//!
//! This is intentionally smaller than `tokio_util::sync::CancellationToken`:
//! the core only ever needs "has someone asked us to stop", checked
//! cooperatively at well-known points, never a cancellation *tree*.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Convenience for loop bodies: `token.check()?;` bails with
    /// `CoreError::Cancelled` at a checkpoint.
    pub fn check(&self) -> crate::CoreResult<()> {
        if self.is_cancelled() {
            Err(crate::CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

//! Cancellation context for verification calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::SpvError;

/// A cloneable cancellation token threaded through `verify_*` calls.
///
/// Verifiers honour cancellation between ancestor iterations and before
/// header-store lookups; a partially computed Merkle root is never
/// observable.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// Create a new, uncancelled context.
    pub fn new() -> Self {
        Context::default()
    }

    /// Request cancellation. Every clone of this context observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fail with [`SpvError::Cancelled`] if cancellation was requested.
    pub fn ensure_active(&self) -> Result<(), SpvError> {
        if self.is_cancelled() {
            return Err(SpvError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared() {
        let ctx = Context::new();
        let clone = ctx.clone();
        assert!(ctx.ensure_active().is_ok());

        clone.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.ensure_active(), Err(SpvError::Cancelled)));
    }
}

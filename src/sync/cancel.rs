//! Cooperative cancellation for synchronization runs
//!
//! The token is checked only at dispatch boundaries. A provider call already in
//! flight is never interrupted; its result is discarded once cancellation is seen.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::sync::error::{SyncError, SyncResult};

/// Cloneable handle to a single, set-once cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Signal cancellation. Idempotent; there is no way to reset a token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(SyncError::Aborted)` once cancellation has been signalled
    pub fn check(&self) -> SyncResult<()> {
        if self.is_cancelled() {
            Err(SyncError::Aborted)
        } else {
            Ok(())
        }
    }
}

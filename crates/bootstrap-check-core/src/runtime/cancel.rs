// crates/bootstrap-check-core/src/runtime/cancel.rs
// ============================================================================
// Module: Cancellation
// Description: Broadcast cancellation for in-flight matrix runs.
// Purpose: Let one interrupt stop scheduling and kill every running child.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! A [`CancelHandle`] raises cancellation once; every cloned [`CancelSignal`]
//! observes it. Runners race their child process against
//! [`CancelSignal::cancelled`] and kill the child when it fires.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tokio::sync::watch;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Owner side of a cancellation channel.
#[derive(Debug)]
pub struct CancelHandle {
    /// Broadcast sender; `true` means cancelled.
    sender: watch::Sender<bool>,
}

/// Observer side of a cancellation channel.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    /// Broadcast receiver; `true` means cancelled.
    receiver: watch::Receiver<bool>,
}

impl CancelHandle {
    /// Creates a handle and its first signal.
    #[must_use]
    pub fn new() -> (Self, CancelSignal) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                sender,
            },
            CancelSignal {
                receiver,
            },
        )
    }

    /// Raises cancellation for every signal.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns a new signal observing this handle.
    #[must_use]
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl CancelSignal {
    /// Returns a signal that is never raised.
    #[must_use]
    pub fn never() -> Self {
        let (_handle, signal) = CancelHandle::new();
        signal
    }

    /// Returns true once cancellation has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes when cancellation is raised.
    ///
    /// If the handle is dropped without cancelling, this never completes.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

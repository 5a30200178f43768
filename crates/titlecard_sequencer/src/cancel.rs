// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cancellation tokens and tracked, cancellable delays.
//!
//! A [`CancelToken`] is shared between a playback run and every task it
//! spawns. [`PendingDelays`] keeps a registry of in-flight waits so the whole
//! set can be abandoned at once.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Returned by a wait that was abandoned before it elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Delay cancelled")]
pub struct Cancelled;

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared "stop requested" flag that tasks can also await
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl CancelToken {
    /// Create a token in the live state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every waiter
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            // Register before checking the flag so a concurrent cancel is not missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Registry of in-flight delays, cancellable as a set
#[derive(Debug, Default)]
pub struct PendingDelays {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, CancelToken>>,
}

impl PendingDelays {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `duration` unless `run` or this delay's own entry is cancelled.
    ///
    /// The run token is checked before the wait is registered and again before
    /// resolving, so a timer that fires after cancellation still reports
    /// [`Cancelled`].
    pub async fn delay(&self, run: &CancelToken, duration: Duration) -> Result<(), Cancelled> {
        if run.is_cancelled() {
            return Err(Cancelled);
        }

        let entry = CancelToken::new();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().insert(id, entry.clone());
        let _registration = Registration { delays: self, id };

        tokio::select! {
            biased;
            _ = run.cancelled() => Err(Cancelled),
            _ = entry.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(duration) => {
                if run.is_cancelled() || entry.is_cancelled() {
                    Err(Cancelled)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Cancel every registered delay and forget them
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<CancelToken> = self.pending.lock().drain().map(|(_, t)| t).collect();
        for token in &drained {
            token.cancel();
        }
        drained.len()
    }

    /// Number of delays still waiting
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no delay is waiting
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

/// Removes a delay from the registry however its future ends (resolved,
/// cancelled or dropped by an aborted task).
struct Registration<'a> {
    delays: &'a PendingDelays,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.delays.pending.lock().remove(&self.id);
    }
}

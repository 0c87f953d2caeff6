//! Per-context mutual exclusion.
//!
//! Each context key gets at most one unit of work at a time; work on
//! different keys interleaves freely. Waiters are served in strict FIFO
//! order through an explicit queue per key, never a recursively growing
//! continuation chain, so memory stays bounded under heavy contention on
//! one key. A key's bookkeeping is discarded as soon as it is neither held
//! nor waited on.
//!
//! There is no timeout and no preemption: a caller's cancellation signal
//! can only affect the protected future's own awaits, the lock is held for
//! the full duration and always released.

use std::collections::{HashMap, VecDeque};
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Default)]
struct LockState {
    held: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// Per-key FIFO lock manager.
#[derive(Default)]
pub struct ContextLockManager {
    locks: Mutex<HashMap<String, LockState>>,
}

impl ContextLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` while holding the lock for `key`.
    ///
    /// Callers on the same key run one at a time in submission order;
    /// callers on different keys never block each other. The lock is
    /// released when `fut` completes, errors, or is dropped mid-flight,
    /// and only then does the next waiter start.
    ///
    /// Hazard: a nested `with_lock` on the same key from inside `fut`
    /// deadlocks. This is by design and not detected.
    pub async fn with_lock<F, T>(&self, key: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        self.acquire(key).await;
        let _release = scopeguard::guard((), |_| self.release(key));
        fut.await
    }

    /// Whether `key` is currently held. Observational snapshot only.
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks.lock().get(key).map(|s| s.held).unwrap_or(false)
    }

    /// Number of callers queued behind the current holder of `key`.
    pub fn waiter_count(&self, key: &str) -> usize {
        self.locks
            .lock()
            .get(key)
            .map(|s| s.waiters.len())
            .unwrap_or(0)
    }

    async fn acquire(&self, key: &str) {
        let pending = {
            let mut locks = self.locks.lock();
            let state = locks.entry(key.to_string()).or_default();
            if state.held {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                debug!(key, waiters = state.waiters.len(), "context lock contended");
                Some(rx)
            } else {
                state.held = true;
                None
            }
        };

        if let Some(rx) = pending {
            // The sender side is only dropped after a failed handoff, and a
            // handoff to a live receiver always succeeds.
            let _ = rx.await;
        }
        debug!(key, "context lock acquired");
    }

    fn release(&self, key: &str) {
        let mut locks = self.locks.lock();
        let Some(state) = locks.get_mut(key) else {
            return;
        };
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                // Handed over; the key stays held by the woken waiter.
                debug!(key, "context lock handed to next waiter");
                return;
            }
            // That waiter's future was dropped while queued; skip it.
        }
        locks.remove(key);
        debug!(key, "context lock released");
    }
}

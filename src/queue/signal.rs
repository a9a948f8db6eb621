//! Readiness handle.
//!
//! A signal says "check the queue", nothing more: no payload, no count.
//! Waiting does not consume it. It stays set until a `next` call leaves the
//! queue empty, so every consumer that looks while work remains sees it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Shared;

/// Waitable view of a queue's readiness flag. Obtained from
/// [`PriorityQueue::signal`](super::PriorityQueue::signal).
pub struct Signal<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Signal<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Non-blocking check.
    pub fn is_ready(&self) -> bool {
        self.shared.store.lock().ready
    }

    /// Block the current thread until the queue has work.
    pub fn wait(&self) {
        let mut store = self.shared.store.lock();
        while !store.ready {
            self.shared.cond.wait(&mut store);
        }
    }

    /// Block for at most `timeout`. Returns true if the queue has work.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };

        let mut store = self.shared.store.lock();
        while !store.ready {
            if self.shared.cond.wait_until(&mut store, deadline).timed_out() {
                return store.ready;
            }
        }
        true
    }

    /// Wait asynchronously until the queue has work.
    ///
    /// Cancel by dropping the future, e.g. via `tokio::time::timeout` or a
    /// `tokio::select!` branch.
    pub async fn ready(&self) {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a raise in between is not missed.
            notified.as_mut().enable();

            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("ready", &self.is_ready())
            .finish()
    }
}

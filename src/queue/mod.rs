//! The priority queue.
//!
//! One FIFO per priority level, all behind a single mutex. Dequeue scans
//! from `Critical` down and takes the front of the first non-empty level,
//! which gives strict priority with arrival order preserved inside a level.
//!
//! Readiness is a sticky one-bit flag kept under the same mutex as the
//! store. Every operation that touches the store finishes by settling the
//! flag against occupancy, so between operations `ready == !is_empty()`.

pub mod signal;

pub use signal::Signal;

use std::collections::VecDeque;
use std::sync::Arc;

use opentelemetry::KeyValue;
use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::model::Priority;
use crate::telemetry::metrics::QueueMetrics;

/// State shared between a queue and the signal handles it gives out.
pub(crate) struct Shared<T> {
    pub(crate) store: Mutex<Store<T>>,
    /// Wakes threads blocked in [`Signal::wait`] / [`Signal::wait_timeout`].
    pub(crate) cond: Condvar,
    /// Wakes tasks awaiting [`Signal::ready`].
    pub(crate) notify: Notify,
}

impl<T> Shared<T> {
    /// Wake every waiter. Called after the flag goes from unset to set.
    fn wake(&self) {
        self.cond.notify_all();
        self.notify.notify_waiters();
    }
}

pub(crate) struct Store<T> {
    levels: [VecDeque<T>; Priority::COUNT],
    len: usize,
    pub(crate) ready: bool,
}

impl<T> Store<T> {
    fn new() -> Self {
        Self {
            levels: std::array::from_fn(|_| VecDeque::new()),
            len: 0,
            ready: false,
        }
    }

    fn push(&mut self, item: T, level: Priority) {
        self.levels[level.index()].push_back(item);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<(T, Priority)> {
        for level in Priority::ALL.into_iter().rev() {
            if let Some(item) = self.levels[level.index()].pop_front() {
                self.len -= 1;
                return Some((item, level));
            }
        }
        None
    }

    /// Bring the flag in line with occupancy. Returns true if it was raised.
    fn settle(&mut self) -> bool {
        let occupied = self.len > 0;
        let raised = occupied && !self.ready;
        self.ready = occupied;
        raised
    }
}

/// Thread-safe FIFO queue with four priority levels and a readiness signal.
///
/// Share it between threads or tasks behind an [`Arc`]. None of the methods
/// block on queue state; to wait for work, combine [`PriorityQueue::signal`]
/// with [`PriorityQueue::next`].
pub struct PriorityQueue<T> {
    shared: Arc<Shared<T>>,
    metrics: QueueMetrics,
}

impl<T> PriorityQueue<T> {
    /// Create an empty queue.
    ///
    /// Metric instruments are taken from the global meter provider here and
    /// kept for the queue's lifetime. Call
    /// [`init_telemetry`](crate::telemetry::init_telemetry) first, or the
    /// queue reports to no-op instruments.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(Store::new()),
                cond: Condvar::new(),
                notify: Notify::new(),
            }),
            metrics: QueueMetrics::new(),
        }
    }

    /// Append an item at [`Priority::Normal`].
    pub fn append(&self, item: T) {
        self.append_priority(item, Priority::Normal);
    }

    /// Append an item at the given level.
    pub fn append_priority(&self, item: T, level: Priority) {
        let raised = {
            let mut store = self.shared.store.lock();
            store.push(item, level);
            trace!(priority = %level, depth = store.len, "item appended");
            store.settle()
        };
        if raised {
            self.shared.wake();
        }
        self.metrics
            .appended
            .add(1, &[KeyValue::new("priority", level.as_str())]);
    }

    /// Append an item at a raw integer level (0 = low .. 3 = critical).
    ///
    /// Out-of-range levels are rejected with [`Error::InvalidPriority`] and
    /// nothing is enqueued. Callers that need the item back on rejection
    /// should convert with [`Priority::try_from`] first.
    ///
    /// [`Error::InvalidPriority`]: crate::error::Error::InvalidPriority
    pub fn try_append_priority(&self, item: T, level: i32) -> Result<()> {
        match Priority::try_from(level) {
            Ok(level) => {
                self.append_priority(item, level);
                Ok(())
            }
            Err(e) => {
                warn!(level, "rejected append with out-of-range priority");
                self.metrics
                    .rejected
                    .add(1, &[KeyValue::new("level", i64::from(level))]);
                Err(e)
            }
        }
    }

    /// Remove and return the highest-priority, earliest-arrived item.
    ///
    /// Returns `None` when the queue is empty. Taking the last item clears
    /// the signal inside the same critical section.
    pub fn next(&self) -> Option<T> {
        let (popped, raised) = {
            let mut store = self.shared.store.lock();
            let popped = store.pop();
            if popped.is_some() {
                trace!(depth = store.len, "item dequeued");
            }
            (popped, store.settle())
        };
        if raised {
            self.shared.wake();
        }
        let (item, level) = popped?;
        self.metrics
            .dequeued
            .add(1, &[KeyValue::new("priority", level.as_str())]);
        Some(item)
    }

    /// Get a handle for waiting on "the queue has work".
    ///
    /// Re-checks the flag against occupancy before returning, so a handle
    /// obtained while items are pending is always ready.
    pub fn signal(&self) -> Signal<T> {
        let raised = {
            let mut store = self.shared.store.lock();
            if store.ready != (store.len > 0) {
                debug!(depth = store.len, ready = store.ready, "repairing signal state");
            }
            store.settle()
        };
        if raised {
            self.shared.wake();
        }
        Signal::new(Arc::clone(&self.shared))
    }

    /// Drain the queue, handing each item to `callback` in dequeue order.
    ///
    /// Stops at the first empty observation and returns how many items were
    /// delivered. Items appended concurrently may or may not be included.
    pub fn process<F>(&self, mut callback: F) -> usize
    where
        F: FnMut(T),
    {
        let mut delivered = 0;
        while let Some(item) = self.next() {
            callback(item);
            delivered += 1;
        }
        delivered
    }

    /// True if no items are queued. A snapshot; may be stale on return.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of queued items. A snapshot; may be stale on return.
    pub fn len(&self) -> usize {
        self.shared.store.lock().len
    }

    /// Number of queued items at one level.
    pub fn len_at(&self, level: Priority) -> usize {
        self.shared.store.lock().levels[level.index()].len()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for PriorityQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.shared.store.lock();
        f.debug_struct("PriorityQueue")
            .field("len", &store.len)
            .field("ready", &store.ready)
            .finish()
    }
}

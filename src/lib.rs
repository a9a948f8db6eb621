//! # prioq
//!
//! Thread-safe FIFO queue with four priority levels and a sticky readiness
//! signal for consumers.
//!
//! Producers [`append`](PriorityQueue::append) items; consumers pull them
//! with [`next`](PriorityQueue::next), block on a [`Signal`] until work
//! exists, or run a [`Dispatcher`](dispatch::Dispatcher) loop.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod queue;
pub mod telemetry;

pub use error::{Error, Result};
pub use model::Priority;
pub use queue::{PriorityQueue, Signal};

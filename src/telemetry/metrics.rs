//! Metric instruments for prioq.
//!
//! Built from the globally registered `MeterProvider` under the `"prioq"`
//! meter. Without a provider installed, the instruments are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("prioq")
}

/// Counter: items appended. Labels: `priority`.
pub fn queue_appended() -> Counter<u64> {
    meter()
        .u64_counter("prioq.queue.appended")
        .with_description("Number of items appended")
        .build()
}

/// Counter: items dequeued. Labels: `priority`.
pub fn queue_dequeued() -> Counter<u64> {
    meter()
        .u64_counter("prioq.queue.dequeued")
        .with_description("Number of items dequeued")
        .build()
}

/// Counter: appends refused for an out-of-range level. Labels: `level`.
pub fn queue_rejected() -> Counter<u64> {
    meter()
        .u64_counter("prioq.queue.rejected")
        .with_description("Appends rejected for an invalid priority level")
        .build()
}

/// Counter: items handed to a dispatcher handler.
pub fn dispatch_handled() -> Counter<u64> {
    meter()
        .u64_counter("prioq.dispatch.handled")
        .with_description("Number of items delivered by dispatchers")
        .build()
}

/// Histogram: duration of one dispatcher drain pass.
pub fn dispatch_drain_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("prioq.dispatch.drain_duration_ms")
        .with_description("Dispatcher drain pass duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Instruments held by each queue, created once so the hot path only adds.
#[derive(Clone)]
pub struct QueueMetrics {
    pub appended: Counter<u64>,
    pub dequeued: Counter<u64>,
    pub rejected: Counter<u64>,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self {
            appended: queue_appended(),
            dequeued: queue_dequeued(),
            rejected: queue_rejected(),
        }
    }
}

impl Default for QueueMetrics {
    fn default() -> Self {
        Self::new()
    }
}

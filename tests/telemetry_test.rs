//! Integration tests for telemetry initialization and span helpers.

use prioq::config::Config;
use prioq::telemetry::{TelemetryConfig, init_telemetry};

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process; a second
    // init in the same binary returns Err, which is acceptable here.
    let config = TelemetryConfig::from(&Config::default());
    assert!(config.endpoint.is_none());
    if let Ok(guard) = init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn drain_span_creates_and_records_items() {
    let span = prioq::telemetry::queue::start_drain_span("test", 3);
    prioq::telemetry::queue::record_drained(&span, 3);
}

#[test]
fn queue_metrics_work_without_a_provider() {
    let metrics = prioq::telemetry::metrics::QueueMetrics::new();
    metrics.appended.add(1, &[]);
    metrics.dequeued.add(1, &[]);
    metrics.rejected.add(1, &[]);
}

#[test]
fn queue_built_without_a_provider_still_operates() {
    let queue = prioq::PriorityQueue::new();
    queue.append("unmetered");
    assert_eq!(queue.next(), Some("unmetered"));
}

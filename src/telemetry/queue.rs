//! Span helpers for dispatcher drain passes.

use tracing::Span;

/// Start a span covering one drain pass of a dispatcher.
///
/// `drain.items` is declared empty and filled in by [`record_drained`].
pub fn start_drain_span(dispatcher: &str, backlog: usize) -> Span {
    tracing::info_span!(
        "queue.drain",
        "drain.dispatcher" = dispatcher,
        "drain.backlog" = backlog,
        "drain.items" = tracing::field::Empty,
    )
}

/// Record how many items a drain pass delivered.
pub fn record_drained(span: &Span, items: usize) {
    span.record("drain.items", items);
    span.in_scope(|| {
        tracing::debug!(items, "drain complete");
    });
}

//! Dispatcher: waits on a queue's signal and drains it into a handler.
//!
//! This is the push-then-pull consumer loop. The signal says work exists,
//! `next` pulls it out in priority order. A poll interval backs up the
//! signal so a dispatcher never sleeps forever on a stale view. Each drain
//! pass takes at most the backlog seen when it started, then goes back
//! through the wait, which is where shutdown wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use opentelemetry::metrics::{Counter, Histogram};
use tokio::sync::watch;
use tracing::{Instrument, info};

use crate::queue::PriorityQueue;
use crate::telemetry::metrics;
use crate::telemetry::queue::{record_drained, start_drain_span};

/// Items handled between cooperative yields inside a drain pass.
const YIELD_EVERY: usize = 64;

/// Configuration for a dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Name used in logs and spans.
    pub name: String,
    /// Fallback wake-up when no signal arrives.
    pub poll_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            name: "dispatcher".to_string(),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Consumer loop over a shared [`PriorityQueue`].
///
/// Clones share the queue, the shutdown switch and the handled counter, so
/// several dispatchers can work one queue and be stopped together.
pub struct Dispatcher<T> {
    queue: Arc<PriorityQueue<T>>,
    config: DispatchConfig,
    shutdown: Arc<watch::Sender<bool>>,
    handled: Arc<AtomicU64>,
    handled_counter: Counter<u64>,
    drain_duration: Histogram<f64>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            config: self.config.clone(),
            shutdown: Arc::clone(&self.shutdown),
            handled: Arc::clone(&self.handled),
            handled_counter: self.handled_counter.clone(),
            drain_duration: self.drain_duration.clone(),
        }
    }
}

impl<T> Dispatcher<T> {
    pub fn new(queue: Arc<PriorityQueue<T>>, config: DispatchConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            queue,
            config,
            shutdown: Arc::new(shutdown),
            handled: Arc::new(AtomicU64::new(0)),
            handled_counter: metrics::dispatch_handled(),
            drain_duration: metrics::dispatch_drain_duration_ms(),
        }
    }

    /// Same dispatcher under a different name, for logs and spans.
    pub fn named(&self, name: impl Into<String>) -> Self {
        let mut other = self.clone();
        other.config.name = name.into();
        other
    }

    /// Stop every dispatcher sharing this switch. Safe to call before `run`.
    /// A running drain pass stops at the next item boundary.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Items delivered so far by this dispatcher and its clones.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Run until shutdown, handing every dequeued item to `handler`.
    ///
    /// The handler runs on the dispatcher's task; keep it short or hand the
    /// item off. Shutdown is checked between items, so `run` returns promptly
    /// even while producers keep the queue busy; undelivered items stay
    /// queued. Returns the number of items this call delivered.
    pub async fn run<F>(&self, mut handler: F) -> u64
    where
        F: FnMut(T),
    {
        let mut stop = self.shutdown.subscribe();
        let signal = self.queue.signal();
        let mut delivered = 0;

        let span = tracing::info_span!("dispatcher", name = %self.config.name);
        async {
            info!("dispatcher started");
            loop {
                tokio::select! {
                    biased;
                    _ = async { let _ = stop.wait_for(|stopped| *stopped).await; } => {
                        info!(delivered, "dispatcher shutting down");
                        return delivered;
                    }
                    _ = signal.ready() => {}
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }

                delivered += self.drain(&mut handler, &stop).await;
            }
        }
        .instrument(span)
        .await
    }

    /// One drain pass, bounded by the backlog present when it starts.
    async fn drain<F>(&self, handler: &mut F, stop: &watch::Receiver<bool>) -> u64
    where
        F: FnMut(T),
    {
        let backlog = self.queue.len();
        let span = start_drain_span(&self.config.name, backlog);
        let started = Instant::now();

        let mut items = 0;
        while items < backlog && !stop_requested(stop) {
            let Some(item) = self.queue.next() else {
                break;
            };
            span.in_scope(|| handler(item));
            items += 1;
            if items % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }

        record_drained(&span, items);
        let items = items as u64;
        if items > 0 {
            self.handled.fetch_add(items, Ordering::Relaxed);
            self.handled_counter.add(items, &[]);
            self.drain_duration
                .record(started.elapsed().as_secs_f64() * 1000.0, &[]);
        }
        items
    }
}

fn stop_requested(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow()
}

//! Integration tests for the readiness signal.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use prioq::{Priority, PriorityQueue};
use rand::Rng;

#[test]
fn append_raises_signal() {
    let q = PriorityQueue::new();
    let signal = q.signal();
    assert!(!signal.is_ready());

    q.append("element");
    assert!(signal.is_ready(), "append did not raise the signal");
}

#[test]
fn signal_from_non_empty_queue_is_ready() {
    let q = PriorityQueue::new();
    q.append_priority(1, Priority::Low);
    assert!(q.signal().is_ready());
}

#[test]
fn signal_stays_set_until_drained() {
    let q = PriorityQueue::new();
    let signal = q.signal();
    q.append(1);
    q.append(2);

    assert_eq!(q.next(), Some(1));
    assert!(signal.is_ready(), "signal cleared with an item still queued");

    assert_eq!(q.next(), Some(2));
    assert!(!signal.is_ready(), "signal left set on an empty queue");
}

#[test]
fn waiting_does_not_consume_the_signal() {
    let q = PriorityQueue::new();
    let signal = q.signal();
    q.append("x");

    assert!(signal.wait_timeout(Duration::from_millis(10)));
    assert!(signal.wait_timeout(Duration::from_millis(10)));
    assert!(signal.is_ready());
}

#[test]
fn wait_timeout_expires_after_drain() {
    let q = PriorityQueue::new();
    let signal = q.signal();
    q.append("only");
    assert!(signal.is_ready());
    assert_eq!(q.next(), Some("only"));

    let started = Instant::now();
    assert!(!signal.wait_timeout(Duration::from_millis(50)));
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn next_on_empty_queue_keeps_signal_clear() {
    let q: PriorityQueue<u8> = PriorityQueue::new();
    let signal = q.signal();
    assert_eq!(q.next(), None);
    assert!(!signal.is_ready());
}

#[test]
fn blocked_waiter_wakes_on_append() {
    let q = Arc::new(PriorityQueue::new());
    let signal = q.signal();

    let waiter = thread::spawn(move || signal.wait_timeout(Duration::from_secs(5)));

    thread::sleep(Duration::from_millis(20));
    q.append("wake up");

    assert!(waiter.join().unwrap(), "waiter timed out despite append");
    assert_eq!(q.next(), Some("wake up"));
}

#[test]
fn every_blocked_waiter_wakes() {
    let q = Arc::new(PriorityQueue::new());

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let signal = q.signal();
            thread::spawn(move || signal.wait_timeout(Duration::from_secs(5)))
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    q.append(1);

    for w in waiters {
        assert!(w.join().unwrap());
    }
}

#[test]
fn wait_then_next_consumer_pattern() {
    let q = Arc::new(PriorityQueue::new());

    let consumer = {
        let q = Arc::clone(&q);
        thread::spawn(move || {
            let signal = q.signal();
            let mut got = Vec::new();
            while got.len() < 3 {
                if signal.wait_timeout(Duration::from_secs(5)) {
                    q.process(|item| got.push(item));
                } else {
                    break;
                }
            }
            got
        })
    };

    for i in 0..3 {
        thread::sleep(Duration::from_millis(5));
        q.append(i);
    }

    assert_eq!(consumer.join().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn async_ready_returns_immediately_when_work_pending() {
    let q = PriorityQueue::new();
    q.append("pending");

    tokio::time::timeout(Duration::from_millis(100), q.signal().ready())
        .await
        .expect("ready() should resolve at once");
}

#[tokio::test]
async fn async_ready_wakes_on_append() {
    let q = Arc::new(PriorityQueue::new());
    let signal = q.signal();

    let waiter = tokio::spawn(async move {
        tokio::time::timeout(Duration::from_secs(5), signal.ready()).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    q.append_priority("urgent", Priority::Critical);

    assert!(waiter.await.unwrap().is_ok(), "async waiter was not woken");
}

#[tokio::test]
async fn async_ready_times_out_on_empty_queue() {
    let q: PriorityQueue<u8> = PriorityQueue::new();
    let result = tokio::time::timeout(Duration::from_millis(30), q.signal().ready()).await;
    assert!(result.is_err());
}

#[test]
fn signal_driven_consumers_receive_everything_and_exit() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const ITEMS: usize = 2_000;

    let q = Arc::new(PriorityQueue::new());
    let finished = Arc::new(AtomicUsize::new(0));
    let deadline = Instant::now() + Duration::from_secs(20);

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let q = Arc::clone(&q);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for i in 0..ITEMS {
                    let level = Priority::ALL[rng.gen_range(0..Priority::COUNT)];
                    q.append_priority((p, i), level);
                    if i % 250 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                finished.fetch_add(1, Ordering::Release);
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let q = Arc::clone(&q);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                let signal = q.signal();
                let mut got = Vec::new();
                loop {
                    assert!(Instant::now() < deadline, "consumer stuck waiting");
                    if signal.wait_timeout(Duration::from_millis(20)) {
                        q.process(|item| got.push(item));
                    } else if finished.load(Ordering::Acquire) == PRODUCERS && q.is_empty() {
                        break;
                    }
                }
                got
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }

    let mut seen = HashSet::new();
    for c in consumers {
        for item in c.join().expect("consumer panicked") {
            assert!(seen.insert(item), "duplicate item {item:?}");
        }
    }

    assert_eq!(seen.len(), PRODUCERS * ITEMS);
    assert!(q.is_empty());
    assert!(!q.signal().is_ready());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_consumers_drain_concurrent_producers() {
    const PRODUCERS: usize = 3;
    const CONSUMERS: usize = 3;
    const ITEMS: usize = 1_000;

    let q = Arc::new(PriorityQueue::new());
    let finished = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let q = Arc::clone(&q);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                for i in 0..ITEMS {
                    q.append((p, i));
                }
                finished.fetch_add(1, Ordering::Release);
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let q = Arc::clone(&q);
            let finished = Arc::clone(&finished);
            tokio::spawn(async move {
                let signal = q.signal();
                let mut got = Vec::new();
                loop {
                    let woke = tokio::time::timeout(Duration::from_millis(20), signal.ready())
                        .await
                        .is_ok();
                    if woke {
                        q.process(|item| got.push(item));
                    } else if finished.load(Ordering::Acquire) == PRODUCERS && q.is_empty() {
                        break;
                    }
                }
                got
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }

    let mut seen = HashSet::new();
    for c in consumers {
        let got = tokio::time::timeout(Duration::from_secs(20), c)
            .await
            .expect("async consumer never exited")
            .unwrap();
        for item in got {
            assert!(seen.insert(item), "duplicate item {item:?}");
        }
    }

    assert_eq!(seen.len(), PRODUCERS * ITEMS);
    assert!(!q.signal().is_ready());
}

//! prioq CLI: exercise the queue under concurrent load.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::bail;
use clap::{Parser, Subcommand};
use prioq::config::Config;
use prioq::dispatch::Dispatcher;
use prioq::telemetry::init_telemetry;
use prioq::{Priority, PriorityQueue};
use rand::Rng;
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "prioq", about = "Priority FIFO queue load driver")]
struct Cli {
    /// TOML config file (defaults to environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Threaded producers and consumers hammering one queue
    Stress {
        #[arg(long, default_value_t = 4)]
        producers: usize,
        #[arg(long, default_value_t = 4)]
        consumers: usize,
        /// Items appended by each producer
        #[arg(long, default_value_t = 10_000)]
        items: usize,
    },
    /// Fill a queue, then drain it with async dispatchers
    Dispatch {
        #[arg(long, default_value_t = 1_000)]
        items: usize,
        #[arg(long, default_value_t = 2)]
        workers: usize,
    },
}

#[derive(Debug, Serialize)]
struct Report {
    mode: &'static str,
    appended: u64,
    received: u64,
    duplicates: u64,
    missing: u64,
    per_level: BTreeMap<Priority, u64>,
    elapsed_ms: u128,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    let _guard = init_telemetry((&config).into())?;

    let report = match cli.command {
        Command::Stress {
            producers,
            consumers,
            items,
        } => {
            tokio::task::spawn_blocking(move || cmd_stress(producers, consumers, items)).await??
        }
        Command::Dispatch { items, workers } => cmd_dispatch(&config, items, workers).await?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.duplicates > 0 || report.missing > 0 {
        bail!(
            "queue lost or duplicated items: {} missing, {} duplicated",
            report.missing,
            report.duplicates
        );
    }
    Ok(())
}

fn random_level(rng: &mut impl Rng) -> Priority {
    Priority::ALL[rng.gen_range(0..Priority::COUNT)]
}

fn cmd_stress(producers: usize, consumers: usize, items: usize) -> anyhow::Result<Report> {
    if producers == 0 || consumers == 0 {
        bail!("need at least one producer and one consumer");
    }

    let queue = Arc::new(PriorityQueue::<(usize, usize)>::new());
    let per_level: Arc<[AtomicU64; Priority::COUNT]> =
        Arc::new(std::array::from_fn(|_| AtomicU64::new(0)));
    let finished = Arc::new(AtomicUsize::new(0));
    let started = Instant::now();

    info!(producers, consumers, items, "stress run starting");

    let producer_handles: Vec<_> = (0..producers)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let per_level = Arc::clone(&per_level);
            let finished = Arc::clone(&finished);
            std::thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for seq in 0..items {
                    let level = random_level(&mut rng);
                    queue.append_priority((p, seq), level);
                    per_level[level.index()].fetch_add(1, Ordering::Relaxed);
                }
                finished.fetch_add(1, Ordering::Release);
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let finished = Arc::clone(&finished);
            std::thread::spawn(move || {
                let signal = queue.signal();
                let mut taken = Vec::new();
                loop {
                    if signal.wait_timeout(Duration::from_millis(20)) {
                        queue.process(|item| taken.push(item));
                    } else if finished.load(Ordering::Acquire) == producers && queue.is_empty() {
                        break;
                    }
                }
                taken
            })
        })
        .collect();

    for handle in producer_handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    }

    let mut seen = HashSet::with_capacity(producers * items);
    let mut received = 0u64;
    let mut duplicates = 0u64;
    for handle in consumer_handles {
        let taken = handle
            .join()
            .map_err(|_| anyhow::anyhow!("consumer thread panicked"))?;
        for item in taken {
            received += 1;
            if !seen.insert(item) {
                duplicates += 1;
            }
        }
    }

    let appended = (producers * items) as u64;
    Ok(Report {
        mode: "stress",
        appended,
        received,
        duplicates,
        missing: appended - seen.len() as u64,
        per_level: level_totals(&per_level),
        elapsed_ms: started.elapsed().as_millis(),
    })
}

async fn cmd_dispatch(config: &Config, items: usize, workers: usize) -> anyhow::Result<Report> {
    if workers == 0 {
        bail!("need at least one worker");
    }

    let queue = Arc::new(PriorityQueue::<Priority>::new());
    {
        let mut rng = rand::thread_rng();
        for _ in 0..items {
            let level = random_level(&mut rng);
            queue.append_priority(level, level);
        }
    }

    let per_level: Arc<[AtomicU64; Priority::COUNT]> =
        Arc::new(std::array::from_fn(|_| AtomicU64::new(0)));
    let base = Dispatcher::new(Arc::clone(&queue), config.dispatch.clone());
    let started = Instant::now();

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let dispatcher = base.named(format!("{}-{i}", config.dispatch.name));
            let per_level = Arc::clone(&per_level);
            tokio::spawn(async move {
                dispatcher
                    .run(|level: Priority| {
                        per_level[level.index()].fetch_add(1, Ordering::Relaxed);
                    })
                    .await
            })
        })
        .collect();

    while base.handled() < items as u64 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    base.shutdown();

    let mut received = 0;
    for handle in handles {
        received += handle.await?;
    }

    let appended = items as u64;
    Ok(Report {
        mode: "dispatch",
        appended,
        received,
        duplicates: received.saturating_sub(appended),
        missing: appended.saturating_sub(received),
        per_level: level_totals(&per_level),
        elapsed_ms: started.elapsed().as_millis(),
    })
}

fn level_totals(counts: &[AtomicU64; Priority::COUNT]) -> BTreeMap<Priority, u64> {
    Priority::ALL
        .into_iter()
        .map(|level| (level, counts[level.index()].load(Ordering::Relaxed)))
        .collect()
}

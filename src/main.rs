//! WorkRing - stress and diagnostic runner
//!
//! Pushes a known set of items through either the raw work-queue Disruptor or the
//! thread pool, verifies every item was delivered exactly once, and reports
//! throughput.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use workring::{
    CounterSnapshot, Disruptor, PoolConfig, TaskHandle, ThreadPool, WaitStrategyKind,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "workring")]
#[command(about = "Stress runner for the lock-free work-queue Disruptor")]
#[command(version)]
pub struct Args {
    /// What to drive: the raw queue or the thread pool
    #[arg(short, long, value_enum, default_value_t = Mode::Raw)]
    pub mode: Mode,

    /// Producer threads
    #[arg(short, long, default_value = "4")]
    pub producers: usize,

    /// Consumer threads (pool workers in pool mode)
    #[arg(short, long, default_value = "4")]
    pub consumers: usize,

    /// Items written by each producer
    #[arg(short, long, default_value = "100000")]
    pub items: u64,

    /// Ring buffer size (must be power of 2)
    #[arg(short, long, default_value = "1024")]
    pub buffer_size: usize,

    /// Wait strategy: busy-spin, spin-hint, yielding, sleeping, backoff
    #[arg(short, long, default_value = "busy-spin")]
    pub wait_strategy: WaitStrategyKind,

    /// Pool configuration file (JSON); overrides --consumers, --buffer-size and --wait-strategy
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Raw,
    Pool,
}

/// Outcome of one run
#[derive(Debug, Serialize)]
struct Report {
    mode: Mode,
    producers: usize,
    consumers: usize,
    capacity: usize,
    wait_strategy: String,
    items: u64,
    delivered: u64,
    checksum_ok: bool,
    elapsed_ms: f64,
    items_per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    counters: Option<CounterSnapshot>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;
    validate_args(&args)?;

    info!("Starting WorkRing stress run");
    debug!("Arguments: {args:?}");

    let report = match args.mode {
        Mode::Raw => run_raw(&args)?,
        Mode::Pool => run_pool(&args)?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!(
            "{} items in {:.2} ms ({:.0} items/s), delivered {}, checksum {}",
            report.items,
            report.elapsed_ms,
            report.items_per_sec,
            report.delivered,
            if report.checksum_ok { "ok" } else { "MISMATCH" }
        );
    }

    if report.delivered != report.items || !report.checksum_ok {
        bail!(
            "delivery check failed: expected {} items, delivered {}",
            report.items,
            report.delivered
        );
    }
    Ok(())
}

/// Initialize logging based on the specified level
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

fn validate_args(args: &Args) -> anyhow::Result<()> {
    if args.producers == 0 || args.consumers == 0 {
        bail!("Producer and consumer counts must be greater than 0");
    }
    if !workring::is_power_of_two(args.buffer_size) {
        bail!(
            "Buffer size must be a power of 2, got: {}",
            args.buffer_size
        );
    }
    Ok(())
}

/// Item `i` of producer `p` carries `p * items + i + 1`, so the expected sum is known
///
/// Checksums are sums modulo 2^64; consumers accumulate with `wrapping_add`.
fn expected_checksum(producers: usize, items: u64) -> u64 {
    let total = producers as u128 * u128::from(items);
    (total * (total + 1) / 2) as u64
}

fn checksum_of<I: IntoIterator<Item = u64>>(values: I) -> u64 {
    values.into_iter().fold(0, u64::wrapping_add)
}

fn run_raw(args: &Args) -> anyhow::Result<Report> {
    let queue = Disruptor::<u64, WaitStrategyKind>::with_wait_strategy(
        args.buffer_size,
        args.wait_strategy,
    )?;
    let items = args.items;
    let start = Instant::now();

    let (delivered, checksum) = thread::scope(|s| -> anyhow::Result<(u64, u64)> {
        let consumers: Vec<_> = (0..args.consumers)
            .map(|_| {
                let queue = &queue;
                s.spawn(move || {
                    let (mut count, mut sum) = (0u64, 0u64);
                    loop {
                        let mut reader = queue.reader();
                        if reader.is_empty() {
                            break (count, sum);
                        }
                        if let Ok(value) = reader.take() {
                            count += 1;
                            sum = sum.wrapping_add(value);
                        }
                    }
                })
            })
            .collect();

        let producers: Vec<_> = (0..args.producers as u64)
            .map(|p| {
                let queue = &queue;
                s.spawn(move || -> workring::Result<()> {
                    for i in 0..items {
                        queue.write(p * items + i + 1)?;
                    }
                    Ok(())
                })
            })
            .collect();

        let produced: Vec<_> = producers.into_iter().map(|p| p.join()).collect();
        // Consumers only exit after stop, even if a producer failed
        queue.request_stop();
        for result in produced {
            result.map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
        }

        let mut totals = (0u64, 0u64);
        for consumer in consumers {
            let (count, sum) = consumer
                .join()
                .map_err(|_| anyhow::anyhow!("consumer thread panicked"))?;
            totals.0 += count;
            totals.1 = totals.1.wrapping_add(sum);
        }
        Ok(totals)
    })?;

    let elapsed = start.elapsed();
    Ok(build_report(
        args,
        Mode::Raw,
        args.consumers,
        args.buffer_size,
        args.wait_strategy,
        delivered,
        checksum,
        elapsed,
        Some(queue.counters()),
    ))
}

fn run_pool(args: &Args) -> anyhow::Result<Report> {
    let config = match &args.config {
        Some(path) => PoolConfig::from_file(path)
            .with_context(|| format!("loading pool config {}", path.display()))?,
        None => PoolConfig::default()
            .with_workers(args.consumers)
            .with_capacity(args.buffer_size)
            .with_wait_strategy(args.wait_strategy),
    };
    let (workers, capacity, wait_strategy) =
        (config.workers, config.capacity, config.wait_strategy);

    let pool = ThreadPool::with_config(config)?;
    let items = args.items;
    let start = Instant::now();

    let results = thread::scope(|s| -> anyhow::Result<Vec<u64>> {
        let producers: Vec<_> = (0..args.producers as u64)
            .map(|p| {
                let pool = &pool;
                s.spawn(move || -> workring::pool::PoolResult<Vec<TaskHandle<u64>>> {
                    (0..items)
                        .map(|i| pool.enqueue(move || p * items + i + 1))
                        .collect()
                })
            })
            .collect();

        let mut results = Vec::new();
        for producer in producers {
            let handles = producer
                .join()
                .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
            for handle in handles {
                results.push(handle.join()?);
            }
        }
        Ok(results)
    })?;

    let elapsed = start.elapsed();
    let stats = pool.shutdown();
    debug!("Pool stats: {stats:?}");

    Ok(build_report(
        args,
        Mode::Pool,
        workers,
        capacity,
        wait_strategy,
        results.len() as u64,
        checksum_of(results.iter().copied()),
        elapsed,
        None,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_report(
    args: &Args,
    mode: Mode,
    consumers: usize,
    capacity: usize,
    wait_strategy: WaitStrategyKind,
    delivered: u64,
    checksum: u64,
    elapsed: Duration,
    counters: Option<CounterSnapshot>,
) -> Report {
    let items = args.producers as u64 * args.items;
    let secs = elapsed.as_secs_f64();
    Report {
        mode,
        producers: args.producers,
        consumers,
        capacity,
        wait_strategy: wait_strategy.to_string(),
        items,
        delivered,
        checksum_ok: checksum == expected_checksum(args.producers, args.items),
        elapsed_ms: secs * 1000.0,
        items_per_sec: if secs > 0.0 { items as f64 / secs } else { 0.0 },
        counters,
    }
}

//! Work Queue Throughput Benchmarks
//!
//! Moves a fixed batch of items from producer threads to consumer threads and
//! compares the work-queue Disruptor against crossbeam's bounded channel, then
//! measures the round trip cost of submitting tasks to the thread pool.

use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use crossbeam::channel::bounded;
use std::thread;
use std::time::Duration;

use workring::{
    BusySpinWithHint, Disruptor, PoolConfig, ThreadPool, WaitStrategy, WaitStrategyKind, Yielding,
};

const BUFFER_SIZE: usize = 1024;
const BATCH_SIZES: [u64; 2] = [10_000, 100_000];
const THREAD_COUNTS: [usize; 2] = [1, 2];

/// One producer/consumer run over a fresh queue; returns the sum consumed
fn run_disruptor<W: WaitStrategy>(queue: Disruptor<u64, W>, threads: usize, items: u64) -> u64 {
    let per_producer = items / threads as u64;
    thread::scope(|s| {
        let queue = &queue;
        let consumers: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(move || {
                    let mut sum = 0u64;
                    loop {
                        let mut reader = queue.reader();
                        if reader.is_empty() {
                            break sum;
                        }
                        sum += *reader.content().unwrap();
                    }
                })
            })
            .collect();

        let producers: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(move || {
                    for i in 0..per_producer {
                        queue.write(i).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        queue.request_stop();

        consumers.into_iter().map(|c| c.join().unwrap()).sum()
    })
}

fn run_crossbeam(threads: usize, items: u64) -> u64 {
    let per_producer = items / threads as u64;
    let (tx, rx) = bounded::<u64>(BUFFER_SIZE);
    thread::scope(|s| {
        let consumers: Vec<_> = (0..threads)
            .map(|_| {
                let rx = rx.clone();
                s.spawn(move || rx.iter().sum::<u64>())
            })
            .collect();
        drop(rx);

        for _ in 0..threads {
            let tx = tx.clone();
            s.spawn(move || {
                for i in 0..per_producer {
                    tx.send(i).unwrap();
                }
            });
        }
        drop(tx);

        consumers.into_iter().map(|c| c.join().unwrap()).sum()
    })
}

fn mpmc_case(group: &mut BenchmarkGroup<'_, WallTime>, threads: usize, items: u64) {
    let param = format!("{threads}P{threads}C/{items}");

    group.bench_with_input(
        BenchmarkId::new("workring_spin_hint", &param),
        &items,
        |b, &items| {
            b.iter(|| {
                let queue = Disruptor::with_wait_strategy(BUFFER_SIZE, BusySpinWithHint).unwrap();
                black_box(run_disruptor(queue, threads, items))
            });
        },
    );

    group.bench_with_input(
        BenchmarkId::new("workring_yielding", &param),
        &items,
        |b, &items| {
            b.iter(|| {
                let queue = Disruptor::with_wait_strategy(BUFFER_SIZE, Yielding::default()).unwrap();
                black_box(run_disruptor(queue, threads, items))
            });
        },
    );

    group.bench_with_input(
        BenchmarkId::new("crossbeam_bounded", &param),
        &items,
        |b, &items| {
            b.iter(|| black_box(run_crossbeam(threads, items)));
        },
    );
}

pub fn mpmc_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for items in BATCH_SIZES {
        group.throughput(Throughput::Elements(items));
        for threads in THREAD_COUNTS {
            mpmc_case(&mut group, threads, items);
        }
    }
    group.finish();
}

pub fn pool_benchmark(c: &mut Criterion) {
    const TASKS: u64 = 10_000;
    let mut group = c.benchmark_group("thread_pool");
    group.throughput(Throughput::Elements(TASKS));
    group.sample_size(20);

    let pool = ThreadPool::with_config(
        PoolConfig::default()
            .with_workers(2)
            .with_capacity(BUFFER_SIZE)
            .with_wait_strategy(WaitStrategyKind::Yielding(Yielding::default())),
    )
    .unwrap();

    group.bench_function("enqueue_and_join", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..TASKS)
                .map(|i| pool.enqueue(move || i * 2).unwrap())
                .collect();
            let sum: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
            black_box(sum)
        });
    });

    group.finish();
    drop(pool);
}

criterion_group!(benches, mpmc_benchmark, pool_benchmark);
criterion_main!(benches);

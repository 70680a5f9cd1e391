//! Worker thread pool on top of the work-queue Disruptor
//!
//! One [`Disruptor`] of boxed jobs is shared by a fixed set of worker threads.
//! Each worker loops: claim a [`ScopedReader`], stop if it is empty, otherwise
//! move the job out, release the slot, and run the job. Dropping the pool
//! requests stop and joins the workers after they have drained the queue.
//!
//! ```rust
//! use workring::pool::ThreadPool;
//!
//! let pool = ThreadPool::new(4).unwrap();
//! let handles: Vec<_> = (0..8)
//!     .map(|i| pool.enqueue(move || i * i).unwrap())
//!     .collect();
//!
//! let results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
//! assert_eq!(results, vec![0, 1, 4, 9, 16, 25, 36, 49]);
//! ```

pub mod config;
pub mod stats;
pub mod task;
pub mod thread_management;

pub use config::PoolConfig;
pub use stats::{PoolStats, PoolStatsSnapshot};
pub use task::{TaskError, TaskHandle};
pub use thread_management::{get_available_cores, ManagedThread, ThreadBuilder};

use crate::disruptor::{Disruptor, DisruptorError, ScopedReader, WaitStrategyKind};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A deferred, zero-argument unit of work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

type JobQueue = Disruptor<Option<Job>, WaitStrategyKind>;

/// Errors raised by the pool and its configuration
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    Config(String),

    #[error("CPU core {core} is not available. Available cores: {available:?}")]
    InvalidCore { core: usize, available: Vec<usize> },

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Work queue error: {0}")]
    Queue(#[from] DisruptorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Fixed-size pool of worker threads fed through a work-queue Disruptor
pub struct ThreadPool {
    queue: Arc<JobQueue>,
    stats: Arc<PoolStats>,
    workers: Vec<ManagedThread>,
    config: PoolConfig,
}

impl ThreadPool {
    /// Create a pool of `workers` threads with default settings
    pub fn new(workers: usize) -> PoolResult<Self> {
        Self::with_config(PoolConfig::default().with_workers(workers))
    }

    /// Create a pool from a full configuration
    ///
    /// # Errors
    /// Fails if the configuration is invalid or a worker cannot be spawned. Any
    /// workers already started are stopped and joined before returning.
    pub fn with_config(config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;

        let queue = Arc::new(JobQueue::with_wait_strategy(
            config.capacity,
            config.wait_strategy,
        )?);
        let stats = Arc::new(PoolStats::new(config.workers));

        let mut pool = Self {
            queue,
            stats,
            workers: Vec::with_capacity(config.workers),
            config,
        };

        for index in 0..pool.config.workers {
            let worker = pool.spawn_worker(index)?;
            pool.workers.push(worker);
        }

        info!(
            workers = pool.config.workers,
            capacity = pool.config.capacity,
            wait_strategy = %pool.config.wait_strategy,
            "thread pool started"
        );
        Ok(pool)
    }

    fn spawn_worker(&self, index: usize) -> PoolResult<ManagedThread> {
        let mut builder = ThreadBuilder::new().thread_name(self.config.thread_name(index));
        if let Some(core) = self.config.core_for(index) {
            builder = builder.pin_at_core(core)?;
        }

        let queue = Arc::clone(&self.queue);
        let stats = Arc::clone(&self.stats);
        builder.spawn(move || worker_loop(&queue, &stats, index))
    }

    /// Submit a closure and get a handle to its eventual result
    ///
    /// Arguments are passed by capturing them in the closure. A panic inside the
    /// closure is caught and reported through the handle as `TaskError::Panicked`;
    /// the worker keeps running.
    ///
    /// Spins while the queue is full.
    pub fn enqueue<F, R>(&self, f: F) -> PoolResult<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (completer, handle) = task::channel();
        let stats = Arc::clone(&self.stats);

        self.submit(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
                stats.record_panicked();
                TaskError::Panicked(task::panic_message(&*payload))
            });
            completer.complete(outcome);
        }))?;

        Ok(handle)
    }

    /// Submit a closure whose result is not needed
    pub fn execute<F>(&self, f: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let stats = Arc::clone(&self.stats);
        self.submit(Box::new(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
                stats.record_panicked();
                warn!(
                    panic = %task::panic_message(&*payload),
                    "detached task panicked"
                );
            }
        }))
    }

    fn submit(&self, job: Job) -> PoolResult<()> {
        // Counted before the write so completed never runs ahead of submitted
        self.stats.record_submitted();
        if let Err(err) = self.queue.write(Some(job)) {
            self.stats.withdraw_submitted();
            return Err(err.into());
        }
        Ok(())
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// The configuration the pool was built from
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Jobs submitted but not yet picked up and released by a worker
    pub fn pending(&self) -> i64 {
        self.queue.outstanding()
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting work, run everything already queued, and join all workers
    pub fn shutdown(mut self) -> PoolStatsSnapshot {
        self.stop_and_join();
        self.stats.snapshot()
    }

    fn stop_and_join(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.queue.request_stop();
        for worker in self.workers.drain(..) {
            let name = worker.thread_name().to_string();
            if worker.join().is_err() {
                warn!(thread = %name, "worker thread panicked");
            }
        }
        info!("thread pool stopped");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.workers.len())
            .field("queue", &self.queue)
            .finish()
    }
}

fn worker_loop(queue: &JobQueue, stats: &PoolStats, index: usize) {
    debug!(worker = index, "worker started");
    loop {
        let job = {
            let mut reader = ScopedReader::new(queue);
            if reader.is_empty() {
                break;
            }
            reader.content().ok().and_then(Option::take)
        };

        if let Some(job) = job {
            job();
            stats.record_completed(index);
        }
    }
    debug!(worker = index, "worker exiting");
}

//! Pool counters
//!
//! Each worker bumps only its own completion counter, so the counters are
//! cache-padded to keep workers from contending on one line.

use crossbeam_utils::CachePadded;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct PoolStats {
    submitted: CachePadded<AtomicU64>,
    panicked: CachePadded<AtomicU64>,
    completed: Box<[CachePadded<AtomicU64>]>,
}

/// Serializable view of [`PoolStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub panicked: u64,
    pub completed_per_worker: Vec<u64>,
}

impl PoolStats {
    pub fn new(workers: usize) -> Self {
        Self {
            submitted: CachePadded::new(AtomicU64::new(0)),
            panicked: CachePadded::new(AtomicU64::new(0)),
            completed: (0..workers)
                .map(|_| CachePadded::new(AtomicU64::new(0)))
                .collect(),
        }
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Undo a `record_submitted` whose write into the queue failed
    pub(crate) fn withdraw_submitted(&self) {
        self.submitted.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, worker: usize) {
        if let Some(counter) = self.completed.get(worker) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> PoolStatsSnapshot {
        let completed_per_worker: Vec<u64> = self
            .completed
            .iter()
            .map(|counter| counter.load(Ordering::Relaxed))
            .collect();
        PoolStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: completed_per_worker.iter().sum(),
            panicked: self.panicked.load(Ordering::Relaxed),
            completed_per_worker,
        }
    }
}

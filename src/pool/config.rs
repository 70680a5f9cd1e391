//! Configuration Management
//!
//! Configuration loading and validation for the worker pool.

use crate::disruptor::{is_power_of_two, WaitStrategyKind};
use crate::pool::{thread_management, PoolError, PoolResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default ring capacity, a power of two
pub const DEFAULT_CAPACITY: usize = 262_144;

/// Default worker thread name prefix
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "workring-worker";

/// Worker pool configuration
///
/// Every field has a default, so a JSON document only needs the fields it changes:
///
/// ```json
/// { "capacity": 1024, "workers": 4, "wait_strategy": { "kind": "yielding", "spin_tries": 50 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Ring buffer slots (must be power of 2)
    pub capacity: usize,
    /// Number of worker threads
    pub workers: usize,
    /// Worker `i` is named `{prefix}-{i}`
    pub thread_name_prefix: String,
    /// Idle action while workers and producers spin
    pub wait_strategy: WaitStrategyKind,
    /// CPU cores to pin workers to, assigned round-robin; empty disables pinning
    pub pin_to_cores: Vec<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            workers: default_workers(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            wait_strategy: WaitStrategyKind::default(),
            pin_to_cores: Vec::new(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

impl PoolConfig {
    /// Parse a configuration from JSON
    pub fn from_json_str(json: &str) -> PoolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> PoolResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategyKind) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    pub fn with_pinned_cores(mut self, cores: Vec<usize>) -> Self {
        self.pin_to_cores = cores;
        self
    }

    /// Check the configuration before any thread is spawned
    pub fn validate(&self) -> PoolResult<()> {
        if self.workers == 0 {
            return Err(PoolError::Config(
                "Worker count must be greater than 0".to_string(),
            ));
        }

        if !is_power_of_two(self.capacity) {
            return Err(PoolError::Config(format!(
                "Capacity must be a power of 2, got: {}",
                self.capacity
            )));
        }

        for &core in &self.pin_to_cores {
            thread_management::validate_core_id(core)?;
        }

        Ok(())
    }

    /// Name of worker `index`
    pub fn thread_name(&self, index: usize) -> String {
        format!("{}-{index}", self.thread_name_prefix)
    }

    /// Core worker `index` is pinned to, if pinning is enabled
    pub fn core_for(&self, index: usize) -> Option<usize> {
        if self.pin_to_cores.is_empty() {
            None
        } else {
            Some(self.pin_to_cores[index % self.pin_to_cores.len()])
        }
    }
}

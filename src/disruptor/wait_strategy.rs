//! Wait Strategy Implementation
//!
//! Every wait in the Disruptor is a poll loop over one of its counters. A wait
//! strategy only decides what a thread does between two failed polls; it never
//! changes when a wait ends, so the ordering and delivery guarantees are identical
//! under every strategy.

use serde::{Deserialize, Serialize};
use std::hint;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

/// Strategy for idling between polls of a Disruptor counter
pub trait WaitStrategy: Send + Sync + std::fmt::Debug {
    /// Called after the `attempt`-th failed poll (starting at 0) of one wait loop
    fn idle(&self, attempt: u32);
}

/// Busy spin wait strategy - lowest possible latency
///
/// Polls again immediately. This is the default.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusySpin;

impl WaitStrategy for BusySpin {
    #[inline]
    fn idle(&self, _attempt: u32) {}
}

/// Busy spin with spin loop hint
///
/// Lets the processor relax the pipeline (or switch hyper threads) between polls.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusySpinWithHint;

impl WaitStrategy for BusySpinWithHint {
    #[inline]
    fn idle(&self, _attempt: u32) {
        hint::spin_loop();
    }
}

/// Yielding wait strategy - spins for a while, then yields the thread
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Yielding {
    spin_tries: u32,
}

impl Yielding {
    /// Create a new yielding wait strategy
    ///
    /// # Arguments
    /// * `spin_tries` - Number of polls to busy spin before yielding
    pub fn new(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for Yielding {
    fn default() -> Self {
        Self::new(100)
    }
}

impl WaitStrategy for Yielding {
    fn idle(&self, attempt: u32) {
        if attempt < self.spin_tries {
            hint::spin_loop();
        } else {
            thread::yield_now();
        }
    }
}

/// Sleeping wait strategy - lowest CPU usage, highest latency
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sleeping {
    sleep_nanos: u64,
}

impl Sleeping {
    /// Create a new sleeping wait strategy
    ///
    /// # Arguments
    /// * `sleep_nanos` - Nanoseconds to sleep between polls
    pub fn new(sleep_nanos: u64) -> Self {
        Self { sleep_nanos }
    }
}

impl Default for Sleeping {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl WaitStrategy for Sleeping {
    fn idle(&self, _attempt: u32) {
        thread::sleep(Duration::from_nanos(self.sleep_nanos));
    }
}

/// Largest `spin_limit` a [`Backoff`] accepts; at most `2^16` hints per poll
pub const MAX_BACKOFF_SPIN_LIMIT: u32 = 16;

/// Exponential back-off
///
/// Spins `2^attempt` hints per poll until `spin_limit`, yields until
/// `yield_limit`, then sleeps for a microsecond between polls.
///
/// Deserialization goes through [`Backoff::new`], so limits read from a
/// config file are clamped the same way.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BackoffLimits")]
pub struct Backoff {
    spin_limit: u32,
    yield_limit: u32,
}

impl Backoff {
    /// `spin_limit` is clamped to [`MAX_BACKOFF_SPIN_LIMIT`], and `yield_limit`
    /// is raised to at least `spin_limit`
    pub fn new(spin_limit: u32, yield_limit: u32) -> Self {
        Self {
            spin_limit: spin_limit.min(MAX_BACKOFF_SPIN_LIMIT),
            yield_limit: yield_limit.max(spin_limit),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(6, 10)
    }
}

/// Raw `Backoff` fields as they appear in configuration
#[derive(Deserialize)]
#[serde(default)]
struct BackoffLimits {
    spin_limit: u32,
    yield_limit: u32,
}

impl Default for BackoffLimits {
    fn default() -> Self {
        let Backoff {
            spin_limit,
            yield_limit,
        } = Backoff::default();
        Self {
            spin_limit,
            yield_limit,
        }
    }
}

impl From<BackoffLimits> for Backoff {
    fn from(limits: BackoffLimits) -> Self {
        Self::new(limits.spin_limit, limits.yield_limit)
    }
}

impl WaitStrategy for Backoff {
    fn idle(&self, attempt: u32) {
        if attempt <= self.spin_limit {
            let shift = attempt.min(MAX_BACKOFF_SPIN_LIMIT);
            for _ in 0..1u32 << shift {
                hint::spin_loop();
            }
        } else if attempt <= self.yield_limit {
            thread::yield_now();
        } else {
            thread::sleep(Duration::from_micros(1));
        }
    }
}

/// Runtime-selected wait strategy, used where the strategy comes from configuration
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitStrategyKind {
    #[default]
    BusySpin,
    BusySpinWithHint,
    Yielding(Yielding),
    Sleeping(Sleeping),
    Backoff(Backoff),
}

impl WaitStrategy for WaitStrategyKind {
    #[inline]
    fn idle(&self, attempt: u32) {
        match self {
            Self::BusySpin => BusySpin.idle(attempt),
            Self::BusySpinWithHint => BusySpinWithHint.idle(attempt),
            Self::Yielding(strategy) => strategy.idle(attempt),
            Self::Sleeping(strategy) => strategy.idle(attempt),
            Self::Backoff(strategy) => strategy.idle(attempt),
        }
    }
}

impl FromStr for WaitStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "busy-spin" | "busyspin" | "spin" => Ok(Self::BusySpin),
            "spin-hint" | "busy-spin-with-hint" => Ok(Self::BusySpinWithHint),
            "yielding" | "yield" => Ok(Self::Yielding(Yielding::default())),
            "sleeping" | "sleep" => Ok(Self::Sleeping(Sleeping::default())),
            "backoff" => Ok(Self::Backoff(Backoff::default())),
            _ => Err(format!("Invalid wait strategy: {s}")),
        }
    }
}

impl std::fmt::Display for WaitStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BusySpin => "busy-spin",
            Self::BusySpinWithHint => "spin-hint",
            Self::Yielding(_) => "yielding",
            Self::Sleeping(_) => "sleeping",
            Self::Backoff(_) => "backoff",
        };
        f.write_str(name)
    }
}

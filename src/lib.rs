//! `WorkRing` - Lock-free Work Queue
//!
//! A fixed-capacity circular buffer that hands work items from many producer
//! threads to many consumer threads. It is a single-cursor ("work queue", not
//! broadcast) variant of the LMAX Disruptor pattern: every item is delivered to
//! exactly one consumer, in global publication order, with no locks and no
//! blocking system calls on the hot path.
//!
//! ## Features
//!
//! - **Lock-free**: Coordination uses only atomic counters and spin waiting
//! - **Mechanical sympathy**: Every counter sits on its own cache line
//! - **Exactly-once delivery**: Each published item is claimed by one reader
//! - **Scoped release**: [`ScopedReader`] acknowledges its slot on every exit path
//! - **Pluggable waiting**: Busy spin by default, back-off strategies on demand
//!
//! ## Quick Start
//!
//! ```rust
//! use workring::{Disruptor, SENTINEL};
//! use std::thread;
//!
//! let queue = Disruptor::<u64>::new(1024).unwrap(); // capacity must be a power of 2
//!
//! thread::scope(|s| {
//!     let consumer = s.spawn(|| {
//!         let mut sum = 0;
//!         loop {
//!             let mut reader = queue.reader();
//!             if reader.is_empty() {
//!                 break sum;
//!             }
//!             sum += reader.take().unwrap();
//!         }
//!     });
//!
//!     for value in 1..=100 {
//!         queue.write(value).unwrap();
//!     }
//!     queue.request_stop();
//!
//!     assert_eq!(consumer.join().unwrap(), 5050);
//! });
//! assert_eq!(queue.claim_read(), SENTINEL);
//! ```
//!
//! ## Architecture
//!
//! - **`Sequence` / `AtomicSequence`**: Cache-line padded counters
//! - **`RingBuffer`**: Pre-allocated power-of-two slot storage
//! - **`Disruptor`**: Claim/commit protocols for writing and reading, plus stop/drain
//! - **`ScopedReader`**: RAII read claim
//! - **`WaitStrategy`**: What a thread does between polls
//! - **`ThreadPool`**: Worker pool built on the queue

pub mod disruptor;
pub mod pool;

// Re-export the main types for convenience
pub use disruptor::{
    // Utility functions
    is_power_of_two,
    AtomicSequence,
    Backoff,
    BusySpin,
    BusySpinWithHint,
    CounterSnapshot,
    // Core types
    Disruptor,
    // Error types
    DisruptorError,
    Result,
    RingBuffer,
    ScopedReader,
    Sequence,
    Sleeping,
    // Wait strategies
    WaitStrategy,
    WaitStrategyKind,
    Yielding,
    // Constants
    INITIAL_CURSOR_VALUE,
    SENTINEL,
};
pub use pool::{PoolConfig, PoolError, TaskError, TaskHandle, ThreadPool};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the version of the `WorkRing` library
#[must_use]
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}

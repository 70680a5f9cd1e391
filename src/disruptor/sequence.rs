//! Padded sequence counters for the Disruptor
//!
//! Each counter occupies its own cache line so that producers advancing one
//! counter never invalidate the line holding another. Two flavours exist:
//!
//! - [`Sequence`]: load/store only, advanced by a single logical owner at a time
//!   (the commit counters and the stop flag).
//! - [`AtomicSequence`]: additionally supports `fetch_add`, for counters claimed
//!   concurrently by many producers or consumers.
//!
//! Both are backed by `AtomicI64`. Stores publish with `Release` and loads observe
//! with `Acquire`, so a thread that sees a committed sequence also sees the slot
//! contents written before the commit.

use std::sync::atomic::{AtomicI64, Ordering};

/// Cache line size for padding to prevent false sharing
///
/// Must match the `repr(align(..))` on the counter types below.
pub const CACHE_LINE_SIZE: usize = 64;

const PADDING: usize = CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>();

/// A cross-thread visible counter isolated to its own cache line
///
/// Supports plain `get`/`set` only. Writers to a `Sequence` are serialized by the
/// protocol built on top of it, so no read-modify-write is offered.
#[repr(align(64))]
pub struct Sequence {
    /// The actual sequence value
    value: AtomicI64,
    /// Padding to prevent false sharing (cache line size - size of AtomicI64)
    _padding: [u8; PADDING],
}

impl Sequence {
    /// Create a new sequence with the given initial value
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: AtomicI64::new(initial_value),
            _padding: [0; PADDING],
        }
    }

    /// Get the current sequence value
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Set the sequence value
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(crate::disruptor::INITIAL_CURSOR_VALUE)
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("value", &self.get())
            .finish()
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// An atomically claimable counter isolated to its own cache line
#[repr(align(64))]
pub struct AtomicSequence {
    value: AtomicI64,
    _padding: [u8; PADDING],
}

impl AtomicSequence {
    /// Create a new atomic sequence with the given initial value
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: AtomicI64::new(initial_value),
            _padding: [0; PADDING],
        }
    }

    /// Get the current sequence value
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Set the sequence value
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Get the current value and then add
    #[inline]
    pub fn get_and_add(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel)
    }

    /// Get the current value and then increment
    #[inline]
    pub fn get_and_increment(&self) -> i64 {
        self.get_and_add(1)
    }
}

impl Default for AtomicSequence {
    fn default() -> Self {
        Self::new(crate::disruptor::INITIAL_CURSOR_VALUE)
    }
}

impl std::fmt::Debug for AtomicSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicSequence")
            .field("value", &self.get())
            .finish()
    }
}

impl std::fmt::Display for AtomicSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

const _: () = assert!(std::mem::size_of::<Sequence>() == CACHE_LINE_SIZE);
const _: () = assert!(std::mem::align_of::<Sequence>() == CACHE_LINE_SIZE);
const _: () = assert!(std::mem::size_of::<AtomicSequence>() == CACHE_LINE_SIZE);
const _: () = assert!(std::mem::align_of::<AtomicSequence>() == CACHE_LINE_SIZE);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequence_creation() {
        let seq = Sequence::new(42);
        assert_eq!(seq.get(), 42);
    }

    #[test]
    fn test_sequence_default() {
        assert_eq!(Sequence::default().get(), crate::disruptor::INITIAL_CURSOR_VALUE);
        assert_eq!(
            AtomicSequence::default().get(),
            crate::disruptor::INITIAL_CURSOR_VALUE
        );
    }

    #[test]
    fn test_sequence_set_get() {
        let seq = Sequence::new(0);
        seq.set(100);
        assert_eq!(seq.get(), 100);
        assert_eq!(seq.to_string(), "100");
    }

    #[test]
    fn test_atomic_sequence_add() {
        let seq = AtomicSequence::new(10);
        assert_eq!(seq.get_and_add(5), 10);
        assert_eq!(seq.get(), 15);

        assert_eq!(seq.get_and_increment(), 15);
        assert_eq!(seq.get(), 16);
    }

    #[test]
    fn test_counters_fill_one_cache_line() {
        // Adjacent counters in an array must never share a line.
        let pair = [Sequence::new(0), Sequence::new(1)];
        let first = &pair[0] as *const Sequence as usize;
        let second = &pair[1] as *const Sequence as usize;
        assert_eq!(second - first, CACHE_LINE_SIZE);
        assert_eq!(first % CACHE_LINE_SIZE, 0);
    }

    #[test]
    fn test_atomic_sequence_thread_safety() {
        let seq = Arc::new(AtomicSequence::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let seq_clone = Arc::clone(&seq);
            handles.push(thread::spawn(move || {
                (0..1000)
                    .map(|_| seq_clone.get_and_increment())
                    .collect::<Vec<_>>()
            }));
        }

        let mut claimed: Vec<i64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        claimed.sort_unstable();

        // Every value handed out exactly once
        assert_eq!(claimed, (0..10_000).collect::<Vec<_>>());
        assert_eq!(seq.get(), 10_000);
    }
}

//! Work-queue Disruptor
//!
//! The coordinator owns the ring buffer and four padded counters:
//!
//! | counter        | kind             | meaning                                          |
//! |----------------|------------------|--------------------------------------------------|
//! | `write_claim`  | `AtomicSequence` | next sequence a producer may claim               |
//! | `write_commit` | `Sequence`       | highest sequence published to readers            |
//! | `read_claim`   | `AtomicSequence` | last sequence handed to a consumer               |
//! | `read_commit`  | `Sequence`       | highest sequence consumed and free for reuse     |
//!
//! Producers claim with `fetch_add`, wait for capacity, fill their slot in
//! parallel, then publish strictly in sequence order. Consumers claim with
//! `fetch_add`, wait for publication, take the item, then acknowledge strictly in
//! sequence order. Ordered acknowledgement keeps `read_commit` a single low-water
//! mark that producers can gate on.
//!
//! A thread that dies between claiming and committing a sequence stalls every
//! later commit. There is no timeout; this is inherent to the protocol.

use crate::disruptor::{
    wait_strategy::{BusySpin, WaitStrategy},
    AtomicSequence, DisruptorError, Result, RingBuffer, ScopedReader, Sequence,
    INITIAL_CURSOR_VALUE, SENTINEL,
};
use serde::Serialize;
use tracing::{debug, info, warn};

const STOP_REQUESTED: i64 = 1;

/// Point-in-time view of the coordinator counters
///
/// Counters are loaded one after another (read side first), so the snapshot is
/// not atomic as a whole, but `read_commit <= write_commit` holds within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub read_commit: i64,
    pub read_claim: i64,
    pub write_commit: i64,
    pub write_claim: i64,
    pub stop_requested: bool,
}

/// Fixed-capacity multi-producer multi-consumer work queue
///
/// Each published item is delivered to exactly one consumer, and items become
/// claimable in global publication order.
///
/// # Type Parameters
/// * `T` - The item type stored in each slot
/// * `W` - The [`WaitStrategy`] used between polls, [`BusySpin`] by default
pub struct Disruptor<T, W = BusySpin> {
    read_commit: Sequence,
    write_commit: Sequence,
    stop: Sequence,
    read_claim: AtomicSequence,
    write_claim: AtomicSequence,
    ring_buffer: RingBuffer<T>,
    capacity: i64,
    wait_strategy: W,
}

impl<T, W> Disruptor<T, W>
where
    T: Default,
    W: WaitStrategy + Default,
{
    /// Create a new Disruptor whose slots start out as `T::default()`
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if capacity is not a power of 2
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_factory(capacity, T::default, W::default())
    }
}

impl<T, W> Disruptor<T, W>
where
    T: Default,
    W: WaitStrategy,
{
    /// Create a new Disruptor with an explicit wait strategy
    pub fn with_wait_strategy(capacity: usize, wait_strategy: W) -> Result<Self> {
        Self::with_factory(capacity, T::default, wait_strategy)
    }
}

impl<T, W> Disruptor<T, W>
where
    W: WaitStrategy,
{
    /// Create a new Disruptor whose slots are pre-populated by `factory`
    ///
    /// # Arguments
    /// * `capacity` - Number of slots (must be a power of 2)
    /// * `factory` - Produces the initial content of every slot
    /// * `wait_strategy` - Idle action between polls
    pub fn with_factory<F>(capacity: usize, factory: F, wait_strategy: W) -> Result<Self>
    where
        F: FnMut() -> T,
    {
        let ring_buffer = RingBuffer::new(capacity, factory)?;
        debug!(capacity, ?wait_strategy, "created work-queue disruptor");

        Ok(Self {
            read_commit: Sequence::new(INITIAL_CURSOR_VALUE),
            write_commit: Sequence::new(INITIAL_CURSOR_VALUE),
            stop: Sequence::new(0),
            read_claim: AtomicSequence::new(INITIAL_CURSOR_VALUE),
            write_claim: AtomicSequence::new(0),
            capacity: ring_buffer.size(),
            ring_buffer,
            wait_strategy,
        })
    }

    /// Write an item into the next slot and publish it
    ///
    /// Spins while the ring is full and then until every earlier sequence has
    /// been published, so publication follows claim order across all producers.
    ///
    /// # Returns
    /// The sequence the item was published at
    ///
    /// # Errors
    /// Returns `DisruptorError::ShutdownWrite` if stop was requested while this
    /// write was waiting for capacity. The item is dropped.
    ///
    /// A rejected write leaves a permanent hole: its sequence stays claimed and
    /// is never published. The queue never reports empty again, so consumers
    /// that drain past the hole spin forever instead of receiving [`SENTINEL`].
    pub fn write(&self, item: T) -> Result<i64> {
        let sequence = self.write_claim.get_and_increment();

        let mut attempt = 0u32;
        while sequence - self.read_commit.get() > self.capacity {
            if self.is_stop_requested() {
                warn!(sequence, "write rejected: stop requested while ring buffer is full");
                return Err(DisruptorError::ShutdownWrite { sequence });
            }
            self.wait_strategy.idle(attempt);
            attempt = attempt.saturating_add(1);
        }

        // SAFETY: the slot's previous occupant (sequence - capacity) has been
        // acknowledged, and no other producer holds this sequence.
        unsafe {
            *self.ring_buffer.slot_ptr(sequence) = item;
        }

        self.wait_until(|| self.write_commit.get() == sequence - 1);
        self.write_commit.set(sequence);
        Ok(sequence)
    }

    /// Claim the next published item for exclusive reading
    ///
    /// # Returns
    /// The claimed sequence, or [`SENTINEL`] once stop has been requested and
    /// every written item has been consumed.
    ///
    /// Every non-sentinel sequence returned must later be passed to
    /// [`finish_read`](Self::finish_read); [`ScopedReader`] does this for you.
    pub fn claim_read(&self) -> i64 {
        let sequence = self.read_claim.get_and_increment() + 1;

        let mut attempt = 0u32;
        while sequence > self.write_commit.get() {
            if self.is_stop_requested() && self.is_empty() {
                return SENTINEL;
            }
            self.wait_strategy.idle(attempt);
            attempt = attempt.saturating_add(1);
        }
        sequence
    }

    /// Shared access to the slot of a claimed sequence
    ///
    /// # Safety
    /// `sequence` must have been returned by [`claim_read`](Self::claim_read) on
    /// this instance and not yet passed to [`finish_read`](Self::finish_read),
    /// and no mutable reference into the slot may be live.
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidSequence` for the sentinel or any negative sequence
    pub unsafe fn content(&self, sequence: i64) -> Result<&T> {
        if sequence < 0 {
            return Err(DisruptorError::InvalidSequence(sequence));
        }
        Ok(&*self.ring_buffer.slot_ptr(sequence))
    }

    /// Mutable access to the slot of a claimed sequence
    ///
    /// # Safety
    /// `sequence` must have been returned by [`claim_read`](Self::claim_read) on
    /// this instance and not yet passed to [`finish_read`](Self::finish_read),
    /// and no other reference into the slot may be live.
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidSequence` for the sentinel or any negative sequence
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn content_mut(&self, sequence: i64) -> Result<&mut T> {
        if sequence < 0 {
            return Err(DisruptorError::InvalidSequence(sequence));
        }
        Ok(&mut *self.ring_buffer.slot_ptr(sequence))
    }

    /// Acknowledge a claimed sequence, releasing its slot to producers
    ///
    /// Spins until every earlier sequence has been acknowledged. Passing the
    /// sentinel is a no-op.
    pub fn finish_read(&self, sequence: i64) {
        if sequence < 0 {
            return;
        }
        self.wait_until(|| self.read_commit.get() == sequence - 1);
        self.read_commit.set(sequence);
    }

    /// Claim the next item inside a guard that acknowledges it on drop
    pub fn reader(&self) -> ScopedReader<'_, T, W> {
        ScopedReader::new(self)
    }

    /// Ask the queue to stop
    ///
    /// Writes blocked on a full ring fail, and readers receive the sentinel once
    /// everything already written has been consumed. Idempotent.
    ///
    /// # Hangs
    /// Each write this rejects leaves an unpublished sequence (see
    /// [`write`](Self::write)), and any reader that reaches it never returns.
    /// Stopping after every producer has finished writing avoids this.
    pub fn request_stop(&self) {
        if !self.is_stop_requested() {
            self.stop.set(STOP_REQUESTED);
            info!(
                outstanding = self.outstanding(),
                "stop requested on work-queue disruptor"
            );
        }
    }

    /// Whether [`request_stop`](Self::request_stop) has been called
    pub fn is_stop_requested(&self) -> bool {
        self.stop.get() == STOP_REQUESTED
    }

    /// True when every claimed write has been read and acknowledged
    pub fn is_empty(&self) -> bool {
        self.write_claim.get() - self.read_commit.get() == 1
    }

    /// Number of write claims not yet acknowledged by a reader
    ///
    /// Includes producers still waiting for capacity.
    pub fn outstanding(&self) -> i64 {
        self.write_claim.get() - self.read_commit.get() - 1
    }

    /// Number of slots in the ring
    pub fn capacity(&self) -> usize {
        self.ring_buffer.buffer_size()
    }

    /// Slot index that `sequence` maps onto
    pub fn slot_index(&self, sequence: i64) -> usize {
        self.ring_buffer.index_of(sequence)
    }

    /// The wait strategy in use
    pub fn wait_strategy(&self) -> &W {
        &self.wait_strategy
    }

    /// Load all counters for diagnostics
    pub fn counters(&self) -> CounterSnapshot {
        CounterSnapshot {
            read_commit: self.read_commit.get(),
            read_claim: self.read_claim.get(),
            write_commit: self.write_commit.get(),
            write_claim: self.write_claim.get(),
            stop_requested: self.is_stop_requested(),
        }
    }

    #[inline]
    fn wait_until<P>(&self, mut ready: P)
    where
        P: FnMut() -> bool,
    {
        let mut attempt = 0u32;
        while !ready() {
            self.wait_strategy.idle(attempt);
            attempt = attempt.saturating_add(1);
        }
    }
}

impl<T, W: WaitStrategy> std::fmt::Debug for Disruptor<T, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disruptor")
            .field("capacity", &self.capacity)
            .field("counters", &self.counters())
            .field("wait_strategy", &self.wait_strategy)
            .finish()
    }
}

//! Scoped read claims
//!
//! A [`ScopedReader`] claims the next item on construction and acknowledges it
//! when dropped, on every exit path including `?` and unwinding panics. Consumers
//! therefore cannot forget to release a slot and stall the acknowledgement chain.
//!
//! ```rust
//! use workring::disruptor::Disruptor;
//!
//! let queue = Disruptor::<Option<String>>::new(8).unwrap();
//! queue.write(Some("job".to_string())).unwrap();
//! queue.request_stop();
//!
//! let job = {
//!     let mut reader = queue.reader();
//!     assert!(!reader.is_empty());
//!     reader.content().unwrap().take()
//! }; // slot released here
//! assert_eq!(job.as_deref(), Some("job"));
//! assert!(queue.reader().is_empty());
//! ```

use crate::disruptor::{
    wait_strategy::{BusySpin, WaitStrategy},
    Disruptor, Result, SENTINEL,
};

/// RAII guard over one read claim
///
/// Neither `Clone` nor `Copy`; the borrow of the Disruptor keeps the guard from
/// outliving it.
#[must_use = "dropping a ScopedReader immediately releases the claimed item unread"]
pub struct ScopedReader<'a, T, W: WaitStrategy = BusySpin> {
    disruptor: &'a Disruptor<T, W>,
    sequence: i64,
}

impl<'a, T, W: WaitStrategy> ScopedReader<'a, T, W> {
    /// Claim the next item, spinning until one is published or the queue is drained after stop
    pub fn new(disruptor: &'a Disruptor<T, W>) -> Self {
        let sequence = disruptor.claim_read();
        Self {
            disruptor,
            sequence,
        }
    }

    /// True when the claim resolved to the sentinel: no item, and none will come
    pub fn is_empty(&self) -> bool {
        self.sequence == SENTINEL
    }

    /// The claimed sequence, or [`SENTINEL`]
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Mutable access to the claimed item
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidSequence` when the reader is empty
    pub fn content(&mut self) -> Result<&mut T> {
        // SAFETY: the sequence came from claim_read on this Disruptor, is only
        // finished in Drop, and `&mut self` rules out a second live reference.
        unsafe { self.disruptor.content_mut(self.sequence) }
    }

    /// Move the claimed item out, leaving `T::default()` in the slot
    pub fn take(&mut self) -> Result<T>
    where
        T: Default,
    {
        self.content().map(std::mem::take)
    }
}

impl<T, W: WaitStrategy> Drop for ScopedReader<'_, T, W> {
    fn drop(&mut self) {
        self.disruptor.finish_read(self.sequence);
    }
}

impl<T, W: WaitStrategy> std::fmt::Debug for ScopedReader<'_, T, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedReader")
            .field("sequence", &self.sequence)
            .finish()
    }
}

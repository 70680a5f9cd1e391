//! Ring Buffer Implementation
//!
//! Fixed, power-of-two sized slot storage. The ring buffer knows nothing about
//! ownership of its slots; all coordination lives in the
//! [`Disruptor`](crate::disruptor::Disruptor).

use crate::disruptor::{is_power_of_two, DisruptorError, Result};
use std::cell::UnsafeCell;

/// Pre-allocated circular slot storage
///
/// # Type Parameters
/// * `T` - The item type stored in each slot
pub struct RingBuffer<T> {
    /// Using `Box<[UnsafeCell<T>]>` for better memory layout than `Vec<T>`
    slots: Box<[UnsafeCell<T>]>,
    /// Mask for fast modulo operations (buffer_size - 1)
    index_mask: i64,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with the specified size, pre-populated by `factory`
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if buffer_size is not a power of 2
    pub fn new<F>(buffer_size: usize, mut factory: F) -> Result<Self>
    where
        F: FnMut() -> T,
    {
        if !is_power_of_two(buffer_size) || i64::try_from(buffer_size).is_err() {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        let slots: Box<[UnsafeCell<T>]> = (0..buffer_size)
            .map(|_| UnsafeCell::new(factory()))
            .collect();

        Ok(Self {
            slots,
            index_mask: (buffer_size - 1) as i64,
        })
    }

    /// Slot index that `sequence` maps onto
    #[inline]
    pub fn index_of(&self, sequence: i64) -> usize {
        (sequence & self.index_mask) as usize
    }

    /// Raw pointer to the slot for `sequence`
    ///
    /// # Safety
    /// The caller must hold exclusive access to the slot, i.e. it owns the
    /// sequence's write or read claim and no other reference into the slot exists.
    #[inline]
    pub unsafe fn slot_ptr(&self, sequence: i64) -> *mut T {
        let index = self.index_of(sequence);
        // SAFETY: the index mask keeps the index within bounds.
        self.slots.get_unchecked(index).get()
    }

    /// Get the size of the buffer
    pub fn buffer_size(&self) -> usize {
        self.slots.len()
    }

    /// Get the size of the buffer as i64
    pub fn size(&self) -> i64 {
        self.index_mask + 1
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.buffer_size())
            .finish()
    }
}

// SAFETY: slots are only touched by the thread holding the matching claim, and
// claims are handed over through Release/Acquire counters. Items move between
// threads but are never shared, so `T: Send` suffices for both.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

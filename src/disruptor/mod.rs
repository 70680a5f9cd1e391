//! WorkRing Disruptor Implementation
//!
//! A single-cursor ("work queue") variant of the LMAX Disruptor: every published
//! item is handed to exactly one consumer, in global publication order, using only
//! padded atomic counters and spin waiting.

pub mod disruptor;
pub mod ring_buffer;
pub mod scoped_reader;
pub mod sequence;
pub mod wait_strategy;


pub use disruptor::{CounterSnapshot, Disruptor};
pub use ring_buffer::RingBuffer;
pub use scoped_reader::ScopedReader;
pub use sequence::{AtomicSequence, Sequence, CACHE_LINE_SIZE};
pub use wait_strategy::{
    Backoff, BusySpin, BusySpinWithHint, Sleeping, WaitStrategy, WaitStrategyKind, Yielding,
};

/// The initial cursor value for sequences
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Returned by a read claim once stop has been requested and the ring is drained
pub const SENTINEL: i64 = -1;

/// Errors that can occur in the Disruptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisruptorError {
    #[error("Buffer size must be a power of 2, got: {0}")]
    InvalidBufferSize(usize),

    #[error("Write of sequence {sequence} rejected: stop requested while the ring buffer is full")]
    ShutdownWrite { sequence: i64 },

    #[error("Invalid sequence: {0}")]
    InvalidSequence(i64),
}

pub type Result<T> = std::result::Result<T, DisruptorError>;

/// Utility function to check if a number is a power of 2
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_power_of_two() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(2));
        assert!(is_power_of_two(4));
        assert!(is_power_of_two(8));
        assert!(is_power_of_two(1024));

        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(3));
        assert!(!is_power_of_two(5));
        assert!(!is_power_of_two(1023));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DisruptorError::InvalidBufferSize(3).to_string(),
            "Buffer size must be a power of 2, got: 3"
        );
        assert_eq!(
            DisruptorError::InvalidSequence(-1).to_string(),
            "Invalid sequence: -1"
        );
        assert!(DisruptorError::ShutdownWrite { sequence: 7 }
            .to_string()
            .contains("sequence 7"));
    }
}

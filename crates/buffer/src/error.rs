use std::io;

use thiserror::Error;

/// Errors raised by buffer operations.
///
/// Buffer-layer failures are synchronous: they are returned at the call site
/// and never travel through a pipeline. Bounds are validated before any byte
/// is touched, so a failed accessor leaves the buffer unchanged.
#[derive(Debug, Error)]
pub enum BufferError {
    /// An index or index/length pair fell outside the accessible region.
    #[error("index {index} with length {length} is out of range for capacity {capacity}")]
    IndexOutOfRange {
        /// First byte the caller asked for.
        index: usize,
        /// Number of bytes the caller asked for.
        length: usize,
        /// Capacity of the buffer at the time of the call.
        capacity: usize,
    },

    /// A retain or release violated the reference-count protocol.
    ///
    /// Raised when an operation touches a buffer whose count already reached
    /// zero, when a retain would resurrect or wrap the counter, and when a
    /// release would drive the counter negative.
    #[error("illegal reference count {count} (attempted change by {delta})")]
    IllegalReferenceCount {
        /// Counter value observed when the operation failed.
        count: usize,
        /// Signed amount the caller tried to apply.
        delta: isize,
    },

    /// A capacity request exceeded the buffer's `max_capacity`.
    #[error("requested capacity {requested} exceeds maximum capacity {max}")]
    Overflow {
        /// Capacity the operation would have needed.
        requested: usize,
        /// Hard ceiling fixed at construction.
        max: usize,
    },

    /// A mutating operation was invoked on a read-only buffer.
    #[error("buffer is read-only")]
    ReadOnly,

    /// A caller-supplied argument was rejected before any work happened.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not defined for this buffer variant.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// An underlying stream transfer failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BufferError {
    pub(crate) fn out_of_range(index: usize, length: usize, capacity: usize) -> Self {
        Self::IndexOutOfRange {
            index,
            length,
            capacity,
        }
    }

    pub(crate) fn released() -> Self {
        Self::IllegalReferenceCount { count: 0, delta: 0 }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = BufferError> = std::result::Result<T, E>;

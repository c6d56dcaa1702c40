//! Unified error types for the index
//!
//! Every fallible operation reports one of these variants. Adapters are expected
//! to keep the kinds apart when translating them into host errors, so the enum is
//! deliberately fine grained.

use std::collections::TryReserveError;

/// Main error type for index operations
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Malformed configuration or arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Metric name did not match any known metric
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Scalar kind name did not match any known encoding
    #[error("Unknown scalar kind: {0}")]
    UnknownScalarKind(String),

    /// Vector length differs from the index dimensions
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Insert attempted while `size == capacity`
    #[error("Capacity exceeded: all {capacity} slots are in use, reserve more first")]
    CapacityExceeded { capacity: usize },

    /// Key is already present among live entries
    #[error("Duplicate key: {key}")]
    DuplicateKey { key: u64 },

    /// Key is not present among live entries
    #[error("Key not found: {key}")]
    KeyNotFound { key: u64 },

    /// Allocation could not be satisfied
    #[error("Out of memory: failed to allocate {requested_bytes} bytes")]
    OutOfMemory { requested_bytes: usize },

    /// Mutation attempted on a memory-mapped view
    #[error("Index is a read-only view of a file")]
    ReadOnlyView,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing, truncated or incompatible index file
    #[error("Corrupt index file: {0}")]
    CorruptFile(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a corrupt file error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptFile(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Map a failed reservation of `requested_bytes` to `OutOfMemory`
    pub fn out_of_memory(requested_bytes: usize) -> impl FnOnce(TryReserveError) -> Self {
        move |_| Self::OutOfMemory { requested_bytes }
    }

    /// Errors caused by the caller's input rather than the index state
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::UnknownMetric(_)
                | Self::UnknownScalarKind(_)
                | Self::DimensionMismatch { .. }
        )
    }

    /// Allocation failures, the only kind worth retrying after freeing memory
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// Errors raised by the persistence layer
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::CorruptFile(_) | Self::Serialization(_)
        )
    }
}

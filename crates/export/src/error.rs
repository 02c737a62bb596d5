//! Error types for export streams

use thiserror::Error;

/// Result type for export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while buffering or handing off export data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(
        "Attempted to commit {consumed} bytes at offset {offset} past block capacity {capacity}"
    )]
    Overflow {
        offset: usize,
        consumed: usize,
        capacity: usize,
    },

    #[error(
        "Attempted export block truncation outside of block: uso({uso}), offset({offset}), mark({mark})"
    )]
    InvalidTruncation { uso: u64, offset: usize, mark: u64 },

    #[error(
        "Universal stream offset exhausted: uso({uso}) + offset({offset}) + {consumed} exceeds u64"
    )]
    UsoOverflow {
        uso: u64,
        offset: usize,
        consumed: usize,
    },

    #[error("Stream block capacity must be greater than zero")]
    ZeroCapacity,

    #[error("Record of {len} bytes exceeds maximum record length {max}")]
    RecordTooLarge { len: usize, max: usize },

    #[error("Invalid rollback to {mark}: committed up to {committed}, stream ends at {end}")]
    InvalidRollback { mark: u64, committed: u64, end: u64 },

    #[error("Transaction mismatch: open transaction is {expected:?}, got {actual}")]
    TransactionMismatch { expected: Option<u64>, actual: u64 },

    #[error("Sink error: {0}")]
    Sink(String),
}

impl Error {
    /// Whether this error means a block's contract was broken by its owner.
    ///
    /// These are never expected at runtime; callers should abort the
    /// operation rather than retry.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::Overflow { .. } | Error::InvalidTruncation { .. })
    }
}

//! WAL errors
//!
//! Only a write that failed and was cut back off the log is recoverable.
//! Every other failure means the file may no longer match what was
//! acknowledged, and the writer refuses further appends.

use std::io;

use thiserror::Error;

/// Result type for WAL operations
pub type WalResult<T> = Result<T, WalError>;

#[derive(Debug, Error)]
pub enum WalError {
    /// Opening or writing the log failed. Nothing unacknowledged remains on
    /// disk.
    #[error("CATALOG_WAL_WRITE_FAILED: {context}: {source}")]
    Write {
        context: String,
        #[source]
        source: io::Error,
    },

    /// fsync failed, so the durability of the file is unknown
    #[error("CATALOG_WAL_FSYNC_FAILED: {context}: {source}")]
    Fsync {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A failed append left bytes behind that could not be removed
    #[error("CATALOG_WAL_TAIL_UNRECOVERABLE: {context}: {source}")]
    TornTail {
        context: String,
        #[source]
        source: io::Error,
    },

    /// An earlier fatal failure closed the log to writes
    #[error("CATALOG_WAL_HALTED: log closed to writes after a fatal failure")]
    Halted,

    /// Checksum, framing or sequence failure on read
    #[error("CATALOG_WAL_CORRUPTION: {0}")]
    Corruption(String),
}

impl WalError {
    pub(crate) fn write(context: impl Into<String>, source: io::Error) -> Self {
        WalError::Write {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn fsync(context: impl Into<String>, source: io::Error) -> Self {
        WalError::Fsync {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corruption(reason: impl Into<String>) -> Self {
        WalError::Corruption(reason.into())
    }

    pub(crate) fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        WalError::Corruption(format!("{} (byte_offset: {})", reason.into(), offset))
    }

    pub(crate) fn corruption_at_sequence(sequence: u64, reason: impl Into<String>) -> Self {
        WalError::Corruption(format!("{} (sequence_number: {})", reason.into(), sequence))
    }

    /// Returns whether the log must not be written again by this process
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WalError::Write { .. })
    }
}

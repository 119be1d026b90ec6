//! Storage error types
//!
//! Constraint violations are reported with the offending key so the catalog
//! layer can turn them into caller-facing conflicts.

use thiserror::Error;

use crate::wal::WalError;

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Store errors
#[derive(Debug, Error)]
pub enum StorageError {
    // ==================
    // Constraint violations
    // ==================
    /// A unique constraint rejected the write
    #[error("Unique constraint {constraint} violated by key {key}")]
    UniqueViolation { constraint: &'static str, key: String },

    /// A row references a parent that does not exist
    #[error("Foreign key {constraint} violated: {key} does not exist")]
    ForeignKeyViolation { constraint: &'static str, key: String },

    /// A delete was blocked by rows that still reference the target
    #[error("Delete of {table} {key} restricted: still referenced by {referenced_by}")]
    Restricted {
        table: &'static str,
        key: String,
        referenced_by: &'static str,
    },

    /// An update or delete named a row that is not there
    #[error("Row not found in {table}: {key}")]
    RowNotFound { table: &'static str, key: String },

    // ==================
    // Durability
    // ==================
    /// The write-ahead log failed
    #[error("{0}")]
    Wal(#[from] WalError),

    /// Snapshot read or write failed
    #[error("Snapshot error at {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A mutation batch or snapshot could not be (de)serialized
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Persisted state cannot be replayed
    #[error("Corrupt store: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub(crate) fn unique(constraint: &'static str, key: impl ToString) -> Self {
        StorageError::UniqueViolation {
            constraint,
            key: key.to_string(),
        }
    }

    pub(crate) fn foreign_key(constraint: &'static str, key: impl ToString) -> Self {
        StorageError::ForeignKeyViolation {
            constraint,
            key: key.to_string(),
        }
    }

    pub(crate) fn not_found(table: &'static str, key: impl ToString) -> Self {
        StorageError::RowNotFound {
            table,
            key: key.to_string(),
        }
    }

    pub(crate) fn snapshot(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::Snapshot {
            path: path.display().to_string(),
            source,
        }
    }

    /// Returns whether the store must not be used after this error
    pub fn is_fatal(&self) -> bool {
        match self {
            StorageError::Wal(e) => e.is_fatal(),
            StorageError::Corrupt(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_names_key() {
        let err = StorageError::unique("products.sku", "DRS-1001");
        assert_eq!(
            err.to_string(),
            "Unique constraint products.sku violated by key DRS-1001"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_corruption_is_fatal() {
        assert!(StorageError::Corrupt("bad snapshot".into()).is_fatal());
        assert!(StorageError::Wal(WalError::corruption("crc")).is_fatal());
    }
}

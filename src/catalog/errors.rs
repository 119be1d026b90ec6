//! Catalog engine errors
//!
//! Every engine operation fails with one of four kinds. Storage constraint
//! violations surfacing from the store are folded into the caller-facing
//! kinds; only durability failures remain `Storage`.

use thiserror::Error;

use crate::schema::CoercionError;
use crate::storage::StorageError;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// A referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// The payload does not conform to the schema
    #[error("{0}")]
    Validation(String),

    /// The write collides with existing state
    #[error("{0}")]
    Conflict(String),

    /// The store failed to persist or recover
    #[error("Storage failure: {0}")]
    Storage(#[source] StorageError),
}

impl CatalogError {
    pub fn not_found(message: impl Into<String>) -> Self {
        CatalogError::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CatalogError::Conflict(message.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "CATALOG_NOT_FOUND",
            CatalogError::Validation(_) => "CATALOG_VALIDATION_FAILED",
            CatalogError::Conflict(_) => "CATALOG_CONFLICT",
            CatalogError::Storage(_) => "CATALOG_STORAGE_FAILURE",
        }
    }

    /// HTTP status a transport should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            CatalogError::NotFound(_) => 404,
            CatalogError::Validation(_) => 400,
            CatalogError::Conflict(_) => 409,
            CatalogError::Storage(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CatalogError::Conflict(_))
    }

    /// True when the store behind the catalog can no longer accept writes
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::Storage(e) if e.is_fatal())
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UniqueViolation { .. } | StorageError::Restricted { .. } => {
                CatalogError::Conflict(err.to_string())
            }
            StorageError::ForeignKeyViolation { .. } | StorageError::RowNotFound { .. } => {
                CatalogError::NotFound(err.to_string())
            }
            other => CatalogError::Storage(other),
        }
    }
}

impl From<CoercionError> for CatalogError {
    fn from(err: CoercionError) -> Self {
        CatalogError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_status() {
        let cases = [
            (CatalogError::not_found("x"), "CATALOG_NOT_FOUND", 404),
            (CatalogError::validation("x"), "CATALOG_VALIDATION_FAILED", 400),
            (CatalogError::conflict("x"), "CATALOG_CONFLICT", 409),
            (
                CatalogError::Storage(StorageError::Corrupt("x".into())),
                "CATALOG_STORAGE_FAILURE",
                500,
            ),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.http_status(), status);
        }
    }

    #[test]
    fn test_constraint_violations_translate() {
        let err: CatalogError = StorageError::UniqueViolation {
            constraint: "products.sku",
            key: "DRS-1001".into(),
        }
        .into();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("DRS-1001"));

        let err: CatalogError = StorageError::ForeignKeyViolation {
            constraint: "products.category_id",
            key: "9".into(),
        }
        .into();
        assert!(err.is_not_found());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_durability_failures_stay_storage() {
        let err: CatalogError = StorageError::Corrupt("bad snapshot".into()).into();
        assert_eq!(err.code(), "CATALOG_STORAGE_FAILURE");
        assert!(err.is_fatal());
    }
}

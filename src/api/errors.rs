//! Request boundary errors
//!
//! Engine errors pass through with their code and HTTP status unchanged.
//! The boundary adds two codes of its own for envelopes it cannot dispatch.

use std::fmt;

use crate::catalog::CatalogError;

/// Result type for request handling
pub type ApiResult<T> = Result<T, ApiError>;

/// Codes raised by the boundary itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// Malformed JSON, missing or mistyped fields
    CatalogInvalidRequest,
    /// `op` names no operation
    CatalogUnknownOperation,
}

impl ApiErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorCode::CatalogInvalidRequest => "CATALOG_INVALID_REQUEST",
            ApiErrorCode::CatalogUnknownOperation => "CATALOG_UNKNOWN_OPERATION",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A caller-facing failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    code: &'static str,
    http_status: u16,
    message: String,
    /// The failure closed the store to writes
    fatal: bool,
}

impl ApiError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self {
            code: ApiErrorCode::CatalogInvalidRequest.code(),
            http_status: 400,
            message: reason.into(),
            fatal: false,
        }
    }

    pub fn unknown_operation(op: &str) -> Self {
        Self {
            code: ApiErrorCode::CatalogUnknownOperation.code(),
            http_status: 400,
            message: format!("Unknown operation: {}", op),
            fatal: false,
        }
    }

    /// Carries an engine error through with its own code and status.
    pub fn from_catalog_error(err: &CatalogError) -> Self {
        Self {
            code: err.code(),
            http_status: err.http_status(),
            message: err.to_string(),
            fatal: err.is_fatal(),
        }
    }

    /// Refusal of a request after the store halted
    pub fn store_halted() -> Self {
        Self {
            code: "CATALOG_STORAGE_FAILURE",
            http_status: 500,
            message: "Store closed to writes after a fatal WAL failure; restart to recover"
                .to_string(),
            fatal: false,
        }
    }

    /// A response body that could not be encoded
    pub fn encoding(err: serde_json::Error) -> Self {
        Self {
            code: "CATALOG_STORAGE_FAILURE",
            http_status: 500,
            message: format!("Failed to encode response: {}", err),
            fatal: false,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for failures of the service rather than of the request
    pub fn is_server_error(&self) -> bool {
        self.http_status >= 500
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self::from_catalog_error(&err)
    }
}

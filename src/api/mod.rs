//! Request boundary
//!
//! Parses JSON requests, runs them against the catalog under a global lock
//! and renders JSON responses. Engine error codes pass through unchanged.

mod errors;
mod handler;
mod request;
mod response;

pub use errors::{ApiError, ApiErrorCode, ApiResult};
pub use handler::ApiHandler;
pub use request::Request;
pub use response::{ErrorResponse, Response, SuccessResponse};

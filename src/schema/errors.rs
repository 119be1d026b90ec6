//! Value coercion errors

use thiserror::Error;

/// A value did not conform to its attribute's type or constraints
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CoercionError {
    attribute: String,
    message: String,
}

impl CoercionError {
    pub(crate) fn new(attribute: &str, message: impl Into<String>) -> Self {
        Self {
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }

    /// Name of the attribute whose value was rejected
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type CoercionResult<T> = Result<T, CoercionError>;

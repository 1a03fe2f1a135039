//! Errors raised by catalog primitives.

use thiserror::Error;

/// Rejected input or inconsistent catalog data.
///
/// Nothing here is retryable: the same input fails the same way. Upstream
/// and storage failures have their own error types in `printsync-infra`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input that does not describe a usable value (unknown operation name,
    /// a shop listed as its own dependent).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Catalog data that contradicts itself, e.g. a price list that does not
    /// line up with the product's variants.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Shop or product identifier that cannot be used in a catalog URL.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

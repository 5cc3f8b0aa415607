//! Shared primitives for all Rust crates in Caseflow.

#![forbid(unsafe_code)]

/// Principal and request-provenance primitives shared across services.
pub mod principal;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use principal::{Actor, Principal, RequestContext};

/// Result type used across Caseflow crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist or is inactive.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller carries no principal at all.
    #[error("unauthenticated: {0}")]
    Unauthorized(String),

    /// Principal is known but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Attempted mutation of a system-managed catalog object.
    #[error("protected: {0}")]
    Protected(String),

    /// The underlying rule store could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The effective permission set could not be computed.
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the small stable code exposed to callers for this category.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::Protected(_) => "protected",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::ResolutionFailed(_) => "resolution_failed",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn non_empty_string_keeps_value() {
        let result = NonEmptyString::new("cases:approve");
        assert!(result.is_ok());
        assert_eq!(
            result.map(|value| String::from(value)).unwrap_or_default(),
            "cases:approve"
        );
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(AppError::Protected("role".to_owned()).code(), "protected");
        assert_eq!(
            AppError::StoreUnavailable("down".to_owned()).code(),
            "store_unavailable"
        );
        assert_eq!(
            AppError::ResolutionFailed("down".to_owned()).code(),
            "resolution_failed"
        );
    }
}

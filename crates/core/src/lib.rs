//! Shared primitives for all Rust crates in Tessera.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::UserIdentity;

/// Result type used across Tessera crates.
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

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required request field is absent or blank.
    #[error("missing field: {0}")]
    MissingField(String),

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// User is not authenticated or not allowed to access a resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Extracts a required string field from an optional payload value.
///
/// Blank and whitespace-only values count as missing, matching the
/// request-rejection rules for role and membership payloads.
pub fn required_field(value: Option<&str>, field_name: &str) -> AppResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.to_owned()),
        _ => Err(AppError::MissingField(field_name.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString, required_field};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn non_empty_string_keeps_value() {
        let result = NonEmptyString::new("branch manager");
        assert!(result.is_ok_and(|value| value.as_str() == "branch manager"));
    }

    #[test]
    fn required_field_rejects_absent_value() {
        let result = required_field(None, "role_name");
        assert!(matches!(result, Err(AppError::MissingField(field)) if field == "role_name"));
    }

    #[test]
    fn required_field_rejects_blank_value() {
        let result = required_field(Some("  "), "access_level");
        assert!(matches!(result, Err(AppError::MissingField(_))));
    }

    #[test]
    fn required_field_returns_present_value() {
        let result = required_field(Some("organization"), "access_level");
        assert!(result.is_ok_and(|value| value == "organization"));
    }
}

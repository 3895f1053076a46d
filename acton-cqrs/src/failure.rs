//! Request-time failure taxonomy
//!
//! A [`Failure`] is raised by the validation gate or by a handler and travels
//! unchanged to the endpoint boundary, where it is classified into exactly one
//! [`ProblemResponse`](crate::problem::ProblemResponse).
//!
//! # Example
//!
//! ```rust
//! use acton_cqrs::failure::{Failure, FailureKind};
//!
//! let failure = Failure::not_found("Product", "abc-123");
//! assert_eq!(failure.kind(), FailureKind::NotFound);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use axum::http::StatusCode;
use thiserror::Error;

/// Per-field validation errors collected in one pass
///
/// Field names map to every message raised for that field, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationFailure {
    /// Create an empty failure
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Builder form of [`add`](Self::add)
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(field, message);
        self
    }

    /// True when no field has been recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of messages across all fields
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Field to messages mapping
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Consume into the field to messages mapping
    pub fn into_errors(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
        write!(
            f,
            "{} validation error(s) on [{}]",
            self.error_count(),
            fields.join(", ")
        )
    }
}

impl std::error::Error for ValidationFailure {}

/// Category of failure
///
/// Each kind maps to exactly one HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// One or more validation rules were violated
    Validation,
    /// The addressed resource does not exist
    NotFound,
    /// The caller is not authenticated
    Unauthorized,
    /// The request conflicts with current state
    Conflict,
    /// Anything outside the taxonomy
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation_failed"),
            Self::NotFound => write!(f, "not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Conflict => write!(f, "conflict"),
            Self::Internal => write!(f, "internal_error"),
        }
    }
}

impl FailureKind {
    /// Get the HTTP status code for this failure kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure raised during validation or handling
#[derive(Debug, Error)]
pub enum Failure {
    /// Raised by the validation gate before dispatch
    #[error("validation failed: {0}")]
    Validation(ValidationFailure),

    /// Raised by a handler when the addressed resource is missing
    #[error("{resource} with id '{id}' not found")]
    NotFound {
        /// Kind of resource, e.g. "Product"
        resource: String,
        /// Identity of the missing resource
        id: String,
    },

    /// Raised by a handler when the caller is not authenticated
    #[error("unauthorized")]
    Unauthorized,

    /// Raised by a handler when the request conflicts with current state
    #[error("conflict: {message}")]
    Conflict {
        /// Human-readable description
        message: String,
        /// The conflicting field, if known
        field: Option<String>,
    },

    /// Anything else; the cause never leaves the server
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl Failure {
    /// Create a not-found failure for a resource
    pub fn not_found(resource: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Create a conflict failure without a field
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            field: None,
        }
    }

    /// Create a conflict failure naming the conflicting field
    pub fn conflict_on(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Coerce any error into an internal failure, keeping it as the cause
    pub fn internal<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Internal(err.into())
    }

    /// The category of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Unauthorized => FailureKind::Unauthorized,
            Self::Conflict { .. } => FailureKind::Conflict,
            Self::Internal(_) => FailureKind::Internal,
        }
    }
}

impl From<ValidationFailure> for Failure {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation(failure)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failure_groups_by_field() {
        let failure = ValidationFailure::new()
            .with("name", "'name' must not be empty.")
            .with("price", "'price' must be between 0 and 1000.")
            .with("name", "'name' must be at most 50 characters.");

        assert_eq!(failure.error_count(), 3);
        assert_eq!(failure.errors()["name"].len(), 2);
        assert_eq!(failure.errors()["price"].len(), 1);
        assert_eq!(failure.to_string(), "3 validation error(s) on [name, price]");
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Validation.to_string(), "validation_failed");
        assert_eq!(FailureKind::NotFound.to_string(), "not_found");
        assert_eq!(FailureKind::Unauthorized.to_string(), "unauthorized");
        assert_eq!(FailureKind::Conflict.to_string(), "conflict");
        assert_eq!(FailureKind::Internal.to_string(), "internal_error");
    }

    #[test]
    fn test_failure_kind_status_codes() {
        assert_eq!(FailureKind::Validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(FailureKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(FailureKind::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(FailureKind::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            FailureKind::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_convenience_constructors() {
        let failure = Failure::not_found("Product", 42);
        assert!(matches!(
            failure,
            Failure::NotFound { ref resource, ref id } if resource == "Product" && id == "42"
        ));

        let failure = Failure::conflict_on("sku", "SKU already in use");
        assert!(matches!(
            failure,
            Failure::Conflict { field: Some(ref f), .. } if f == "sku"
        ));
    }

    #[test]
    fn test_foreign_errors_become_internal() {
        let io = std::io::Error::other("disk on fire");
        let failure = Failure::internal(io);
        assert_eq!(failure.kind(), FailureKind::Internal);

        let failure: Failure = anyhow::anyhow!("pool exhausted").into();
        assert_eq!(failure.kind(), FailureKind::Internal);
        assert!(failure.to_string().contains("pool exhausted"));
    }
}

//! Error types raised while wiring endpoints together
//!
//! Everything in this module surfaces at startup: loading configuration,
//! registering handlers and validators, and binding endpoints. A service
//! that gets past startup never sees these at request time. Request-time
//! failures are modelled by [`Failure`](crate::failure::Failure).

use thiserror::Error;

/// Result type alias using the framework error
pub type Result<T> = std::result::Result<T, Error>;

/// Startup and configuration error
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Tracing subscriber could not be installed
    #[error("Tracing error: {0}")]
    Tracing(String),

    /// A second handler was registered for the same command or query type
    #[error("Handler already registered for {request}")]
    DuplicateHandler {
        /// Stable name of the command or query
        request: &'static str,
    },

    /// An endpoint was bound to a command or query without a handler
    #[error("No handler registered for {request}")]
    MissingHandler {
        /// Stable name of the command or query
        request: &'static str,
    },

    /// A second rule set was registered for the same command or query type
    #[error("Validator already registered for {request}")]
    DuplicateValidator {
        /// Stable name of the command or query
        request: &'static str,
    },

    /// Success status outside of 200, 201 and 202
    #[error("Unsupported success status {status}: expected 200, 201 or 202")]
    UnsupportedSuccessStatus {
        /// The rejected status code
        status: u16,
    },

    /// A structural projection cannot map between the two shapes
    #[error("Incompatible mapping from {from} to {to}: {reason}")]
    IncompatibleMapping {
        /// Source type name
        from: &'static str,
        /// Target type name
        to: &'static str,
        /// Why the probe failed
        reason: String,
    },

    /// Route pattern rejected before it reaches the router
    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_request() {
        let err = Error::DuplicateHandler {
            request: "CreateProduct",
        };
        assert_eq!(err.to_string(), "Handler already registered for CreateProduct");

        let err = Error::MissingHandler {
            request: "GetProductById",
        };
        assert_eq!(err.to_string(), "No handler registered for GetProductById");
    }

    #[test]
    fn test_unsupported_status_message() {
        let err = Error::UnsupportedSuccessStatus { status: 204 };
        assert!(err.to_string().contains("204"));
    }

    #[test]
    fn test_figment_error_is_boxed() {
        let err: Error = figment::Error::from("missing field `name`".to_string()).into();
        assert!(matches!(err, Error::Config(_)));
    }
}

//! Error types for the reconciliation library
//!
//! This module defines all error types used throughout the crate.

use crate::resource::ChangeResult;
use thiserror::Error;

/// Result type alias for reconcile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation library
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// API-level errors reported by the server
    #[error("API error ({controller}): {message}")]
    Api {
        /// Controller the request was addressed to
        controller: String,
        /// Error message as reported by the server
        message: String,
    },

    /// Resource not found where one was required
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed descriptor input (unknown field, bad boolean, invalid CIDR)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A reference field names a resource that does not exist
    #[error("Unresolved reference: {0}")]
    Reference(String),

    /// A scenario step produced a different result than expected
    #[error("Step '{step}': expected {expected}, got {actual}")]
    Assertion {
        /// Label of the failing step
        step: String,
        /// The result the scenario expected
        expected: ChangeResult,
        /// The result the reconcile actually produced
        actual: ChangeResult,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an API error for a controller
    pub fn api(controller: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            controller: controller.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unresolved reference error
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

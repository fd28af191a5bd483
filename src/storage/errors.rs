//! Storage-layer error types.
//!
//! These cover data persistence failures only; SCIM protocol and business
//! errors live in [`crate::error`]. The provider maps any storage failure it
//! cannot interpret to a generic internal error before it reaches a client.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Data could not be stored or read back in the expected shape.
    #[error("Invalid stored data: {message}")]
    InvalidData { message: String },

    /// Malformed query parameters (bad attribute path, etc.).
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// Backend is temporarily unable to serve the request.
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    /// Anything else.
    #[error("Internal storage error: {message}")]
    Internal { message: String },
}

impl StorageError {
    /// Create an invalid-data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create an invalid-query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        assert_eq!(
            StorageError::invalid_data("not an object").to_string(),
            "Invalid stored data: not an object"
        );
        assert_eq!(
            StorageError::invalid_query("bad path").to_string(),
            "Invalid query: bad path"
        );
    }
}

//! Error types for the zonesync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for zonesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the zonesync system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing credentials, zone, malformed config)
    #[error("configuration error: {0}")]
    Config(String),

    /// Adapter initialization failures; fatal to process startup
    #[error("initialization error ({provider}): {message}")]
    Init {
        /// Provider name
        provider: String,
        /// Failure description
        message: String,
    },

    /// Record rejected before any network call
    #[error("validation error: {0}")]
    Validation(String),

    /// Non-ok backend response that matches no known no-op condition
    #[error("provider API error ({provider}): {message}")]
    Api {
        /// Provider name
        provider: String,
        /// Error message reported by the backend
        message: String,
    },

    /// Delete succeeded but the follow-up create failed, so the record is
    /// now absent upstream rather than merely unchanged
    #[error("partial update of {name} ({rtype}): old record deleted, create failed: {reason}")]
    PartialUpdate {
        /// Record name
        name: String,
        /// Record type
        rtype: String,
        /// Why the create step failed
        reason: String,
    },

    /// Timeout or connection failure on an outbound call
    #[error("network error: {0}")]
    Network(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

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

    /// Create an initialization error
    pub fn init(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Init {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a provider API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a partial update error
    pub fn partial_update(
        name: impl Into<String>,
        rtype: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::PartialUpdate {
            name: name.into(),
            rtype: rtype.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// True for errors that abort process startup rather than a single item
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Init { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

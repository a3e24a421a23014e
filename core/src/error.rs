//! Error types for the MedPal API client.
//!
//! # Design
//! Failures that carry an HTTP status land in `Http` with the normalized,
//! human-readable message. Timeouts and transport failures have no status,
//! so callers can tell "the server said no" from "the server never
//! answered".

use std::time::Duration;

use thiserror::Error;

/// Errors produced while building, executing or decoding API requests.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{message} (HTTP {status})")]
    Http { status: u16, message: String },

    /// The cancellation timer fired before a response arrived.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request never produced a response (DNS, connection, IO).
    #[error("transport failed: {0}")]
    Transport(String),

    /// A success body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status of the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The message a UI would render for this failure.
    pub fn message(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Errors raised while loading `ClientConfig` from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

//! Error types for the LCA client
//!
//! Every failure an operation can surface maps to exactly one user-visible
//! string via [`ClientError::display_message`].

use std::time::Duration;
use thiserror::Error;

/// Fallback shown when no better message can be derived
pub const GENERIC_UPLOAD_FAILURE: &str = "Upload failed.";

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Precondition not met; no request was issued
    #[error("{0}")]
    Validation(String),

    /// A submission is already in flight
    #[error("An upload is already in progress")]
    Busy,

    /// Request exceeded its time bound
    #[error("timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    /// Transport-level failure (connect, reset, body read, ...)
    #[error("{0}")]
    Network(String),

    /// Non-success response from the backend
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Success response whose payload could not be interpreted at all
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Credential could not be stored, loaded or attached
    #[error("Credential error: {0}")]
    Credential(String),

    /// lca-common error
    #[error(transparent)]
    Common(#[from] lca_common::Error),
}

impl ClientError {
    /// The single message shown to the user for this failure
    pub fn display_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            GENERIC_UPLOAD_FAILURE.to_string()
        } else {
            message
        }
    }

    /// Classify a reqwest failure, keeping timeouts distinct
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(timeout)
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

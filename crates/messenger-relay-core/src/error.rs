//! Error types for relay operations.
//!
//! Each component owns one error enum. Only [`VerificationError`],
//! [`CodecError`] (on decode) and [`DispatchError`] ever reach the webhook
//! caller; [`SendError`] is contained to the event that produced it.

use thiserror::Error;

/// Subscription handshake failures.
///
/// Both variants are caller-class errors and map to `400 Bad Request`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The supplied `hub.verify_token` does not match the configured token.
    #[error("Invalid verification token")]
    InvalidToken,

    /// The supplied `hub.mode` is not `subscribe`.
    #[error("Invalid subscription mode: {mode}")]
    InvalidMode { mode: String },
}

/// Payload codec failures.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The inbound body is not valid JSON or does not match the payload shape.
    #[error("Failed to decode webhook payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound envelope could not be serialized.
    #[error("Failed to encode outbound message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failures that abort dispatch of a whole webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The payload's `object` field is not a kind this relay handles.
    #[error("Unsupported object kind: {object_kind:?}")]
    UnsupportedObjectKind { object_kind: String },
}

/// Outbound Send API failures.
///
/// These never abort a delivery; the dispatcher logs them and moves on.
#[derive(Debug, Error)]
pub enum SendError {
    /// The outbound envelope could not be encoded.
    #[error("Encoding failed: {0}")]
    Encode(#[from] CodecError),

    /// The request never produced a response (connect failure, timeout, TLS).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The sender could not be constructed from its configuration.
    #[error("Sender configuration error: {message}")]
    Configuration { message: String },

    /// The platform answered with a non-success status.
    #[error("Platform rejected message: {status} - {body}")]
    Platform { status: u16, body: String },
}

impl SendError {
    /// Check if this error represents a condition that may clear on its own.
    ///
    /// Transport failures, server errors (5xx) and rate limiting (429) are
    /// transient. The relay never retries, so this only informs log readers.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Encode(_) => false,
            Self::Configuration { .. } => false,
            Self::Transport { .. } => true,
            Self::Platform { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the access token.
        let e = e.without_url();
        let message = if e.is_timeout() {
            format!("request timed out: {}", e)
        } else {
            e.to_string()
        };
        Self::Transport { message }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use messenger_relay_core::{CodecError, DispatchError, SendError, VerificationError};
use tracing::{error, warn};

/// Callback handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: the subscription handshake was rejected. The body is
///   always the bare reason phrase so nothing about the expected token leaks.
/// - `500 Internal Server Error`: the delivery body could not be decoded, or
///   it was not a page delivery. The body carries the failure detail.
///
/// Bodies are plain text; the platform only inspects the status code.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// Subscription handshake failed
    #[error("Verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// Delivery body is not a valid webhook payload
    #[error("{0}")]
    Decode(#[from] CodecError),

    /// Delivery was decoded but cannot be dispatched
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

impl CallbackError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Verification(_) => StatusCode::BAD_REQUEST,
            Self::Decode(_) | Self::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Self::Verification(e) => {
                warn!(error = %e, "Rejecting subscription handshake");
                "Bad Request".to_string()
            }
            Self::Decode(e) => {
                error!(error = %e, "Rejecting undecodable webhook delivery");
                format!("Internal Server Error: {}", self)
            }
            Self::Dispatch(e) => {
                error!(error = %e, "Rejecting webhook delivery");
                format!("Internal Server Error: {}", self)
            }
        };

        (status, body).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to create Send API client: {0}")]
    SenderSetup(#[from] SendError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

//! Outbound delivery through the platform's Send API.
//!
//! [`GraphApiSender`] performs exactly one `POST` per reply:
//!
//! ```text
//! POST {graph_api_url}/{api_version}/me/messages?access_token=<token>
//! Content-Type: application/json
//!
//! {"recipient":{"id":"<psid>"},"message":{"text":"<reply>"}}
//! ```
//!
//! There is no retry and no backoff. A failed send is reported once and the
//! caller decides what to do with it.

use crate::error::SendError;
use crate::payload::{self, OutboundEnvelope};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;
use zeroize::Zeroizing;

/// Delivers a text reply to a recipient.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `text` to `recipient_id`.
    ///
    /// # Errors
    ///
    /// * [`SendError::Encode`] - the envelope could not be serialized
    /// * [`SendError::Transport`] - no response was received (including timeouts)
    /// * [`SendError::Platform`] - the platform answered with a non-2xx status
    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), SendError>;
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for [`GraphApiSender`].
///
/// # Examples
///
/// ```
/// use messenger_relay_core::SenderConfig;
/// use std::time::Duration;
///
/// let config = SenderConfig::default()
///     .with_graph_api_url("http://localhost:9000")
///     .with_timeout(Duration::from_secs(2));
/// assert_eq!(config.api_version, "v2.6");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Graph API base URL, without version
    pub graph_api_url: String,
    /// Graph API version path segment
    pub api_version: String,
    /// Request timeout; expiry is reported as a transport error
    pub timeout: Duration,
    /// User agent string for outbound requests
    pub user_agent: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            graph_api_url: "https://graph.facebook.com".to_string(),
            api_version: "v2.6".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("messenger-relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SenderConfig {
    /// Set the Graph API base URL.
    pub fn with_graph_api_url(mut self, url: impl Into<String>) -> Self {
        self.graph_api_url = url.into();
        self
    }

    /// Set the Graph API version segment.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The Send API endpoint, without credentials.
    pub fn messages_endpoint(&self) -> Result<Url, SendError> {
        let raw = format!(
            "{}/{}/me/messages",
            self.graph_api_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        );
        Url::parse(&raw).map_err(|e| SendError::Configuration {
            message: format!("invalid Send API URL '{}': {}", raw, e),
        })
    }
}

// ============================================================================
// Graph API Sender
// ============================================================================

/// [`MessageSender`] backed by the Graph API Send endpoint.
pub struct GraphApiSender {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Zeroizing<String>,
}

impl GraphApiSender {
    /// Create a sender for the given page access token.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Configuration`] if the endpoint URL is invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: &SenderConfig, access_token: impl Into<String>) -> Result<Self, SendError> {
        let endpoint = config.messages_endpoint()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| SendError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            endpoint,
            access_token: Zeroizing::new(access_token.into()),
        })
    }

    /// The Send API endpoint this sender posts to, without credentials.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn authorized_endpoint(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("access_token", self.access_token.as_str());
        url
    }
}

impl std::fmt::Debug for GraphApiSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphApiSender")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl MessageSender for GraphApiSender {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), SendError> {
        let envelope = OutboundEnvelope::text(recipient_id, text);
        let body = payload::encode(&envelope)?;

        debug!(endpoint = %self.endpoint, "Calling Send API");

        let response = self
            .http
            .post(self.authorized_endpoint())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let response_body = response.text().await?;

        debug!(
            status = status.as_u16(),
            response = %response_body,
            "Send API response"
        );

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                response = %response_body,
                "Send API returned non-success status"
            );
            return Err(SendError::Platform {
                status: status.as_u16(),
                body: response_body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;

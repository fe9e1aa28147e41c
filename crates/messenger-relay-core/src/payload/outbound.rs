//! Send API request body.

use super::Participant;
use serde::Serialize;

/// Body of a Send API call: who receives the message and what it says.
///
/// Built fresh for every send.
///
/// # Examples
///
/// ```rust
/// use messenger_relay_core::payload::{self, OutboundEnvelope};
///
/// let envelope = OutboundEnvelope::text("U1", "Hello hi");
/// let bytes = payload::encode(&envelope).unwrap();
/// assert_eq!(bytes, br#"{"recipient":{"id":"U1"},"message":{"text":"Hello hi"}}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEnvelope {
    pub recipient: Participant,
    pub message: OutboundMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub text: String,

    /// Opaque string echoed back in the `message_echoes` webhook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl OutboundEnvelope {
    /// Create a plain text message for `recipient_id`.
    pub fn text(recipient_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient: Participant::new(recipient_id),
            message: OutboundMessage {
                text: text.into(),
                metadata: None,
            },
        }
    }
}

//! Webhook payload model and wire codec.
//!
//! A webhook delivery is a [`Payload`] holding a sequence of [`Entry`] values,
//! each carrying the [`MessagingEvent`]s for one page. Decoding is lenient:
//! absent optional fields fall back to empty/zero values, unknown fields are
//! ignored, and only malformed JSON, a type mismatch, or a missing `sender` /
//! `recipient` is rejected.
//!
//! Each event is classified into an [`EventKind`] while it is decoded, so
//! downstream code matches on one enum instead of probing optional fields.
//!
//! # Examples
//!
//! ```rust
//! use messenger_relay_core::payload::{self, EventKind};
//!
//! let body = br#"{
//!     "object": "page",
//!     "entry": [{
//!         "id": "1",
//!         "time": 100,
//!         "messaging": [{
//!             "sender": {"id": "U1"},
//!             "recipient": {"id": "P1"},
//!             "message": {"text": "hi"}
//!         }]
//!     }]
//! }"#;
//!
//! let decoded = payload::decode(body).unwrap();
//! let event = &decoded.entries[0].events[0];
//! assert!(matches!(&event.kind, EventKind::Message(m) if m.text == "hi"));
//! ```

mod event;
mod outbound;

pub use event::{
    AccountLinking, Attachment, DeliveryReceipt, EventKind, InboundMessage, MessagingEvent, OptIn,
    Postback, ReadReceipt,
};
pub use outbound::{OutboundEnvelope, OutboundMessage};

use crate::error::CodecError;
use serde::{Deserialize, Deserializer, Serialize};

/// The only `object` discriminator this relay dispatches.
pub const PAGE_OBJECT_KIND: &str = "page";

// ============================================================================
// Inbound Model
// ============================================================================

/// A single webhook delivery.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Payload {
    /// Discriminator for the subscription that produced this delivery.
    #[serde(rename = "object", default, deserialize_with = "null_as_default")]
    pub object_kind: String,

    /// Entries in delivery order.
    #[serde(rename = "entry", default, deserialize_with = "null_as_default")]
    pub entries: Vec<Entry>,
}

impl Payload {
    /// Returns `true` if this delivery belongs to a page subscription.
    pub fn is_page(&self) -> bool {
        self.object_kind == PAGE_OBJECT_KIND
    }

    /// Total number of messaging events across all entries.
    pub fn event_count(&self) -> usize {
        self.entries.iter().map(|e| e.events.len()).sum()
    }
}

/// Batch of events for one page.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Entry {
    /// Page ID.
    #[serde(rename = "id", default, deserialize_with = "null_as_default")]
    pub source_id: String,

    /// Time of update, epoch milliseconds.
    #[serde(rename = "time", default, deserialize_with = "null_as_default")]
    pub timestamp_ms: i64,

    #[serde(rename = "messaging", default, deserialize_with = "null_as_default")]
    pub events: Vec<MessagingEvent>,
}

/// A page-scoped user or page identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Decode a raw webhook body into a [`Payload`].
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON, a type mismatch on any
/// field, or an event without `sender` or `recipient`.
pub fn decode(bytes: &[u8]) -> Result<Payload, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

/// Encode an outbound envelope into its Send API wire form.
///
/// Unset optional fields are omitted rather than written as `null`.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails. The envelope has a
/// fixed shape of strings, so this path only guards against serializer
/// failures and is not expected in practice.
pub fn encode(envelope: &OutboundEnvelope) -> Result<Vec<u8>, CodecError> {
    to_wire(envelope)
}

fn to_wire<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(CodecError::Encode)
}

/// Deserialize a field, mapping an explicit JSON `null` to the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

//! Messaging events and their classification.

use super::{null_as_default, Participant};
use serde::{Deserialize, Deserializer};
use tracing::warn;

/// One classified event within an [`Entry`](super::Entry).
///
/// Deserialized through an intermediate record that mirrors the wire shape;
/// the variant fields are folded into [`EventKind`] in a single step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawMessagingEvent")]
pub struct MessagingEvent {
    pub sender: Participant,
    pub recipient: Participant,

    /// Epoch milliseconds.
    pub timestamp_ms: i64,

    pub kind: EventKind,
}

/// What a [`MessagingEvent`] represents.
///
/// The platform intends at most one variant field per event. When several
/// are present, the first in this order wins: message, postback, optin,
/// account linking, delivery, read.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Message(InboundMessage),
    Postback(Postback),
    OptIn(OptIn),
    AccountLinking(AccountLinking),
    Delivery(DeliveryReceipt),
    Read(ReadReceipt),

    /// No recognised variant field was present.
    Unclassified,
}

impl EventKind {
    /// Wire name of the variant field, used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Postback(_) => "postback",
            Self::OptIn(_) => "optin",
            Self::AccountLinking(_) => "account_linking",
            Self::Delivery(_) => "delivery",
            Self::Read(_) => "read",
            Self::Unclassified => "unclassified",
        }
    }
}

// ============================================================================
// Variant Payloads
// ============================================================================

/// A message sent by a user to the page (or echoed back from the page).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "mid", default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(rename = "seq", default, deserialize_with = "null_as_default")]
    pub sequence_number: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,

    /// A message carrying both `attachments` and `attachment` fails to decode
    /// as a duplicate field.
    #[serde(default, alias = "attachment")]
    pub attachments: Option<Vec<Attachment>>,

    /// Developer payload of the tapped quick reply, if any.
    #[serde(
        rename = "quick_reply",
        default,
        deserialize_with = "quick_reply_payload"
    )]
    pub quick_reply_payload: Option<String>,

    /// Set when the page itself sent this message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_echo: bool,

    /// App that sent an echoed message. The platform sends this as a number.
    #[serde(rename = "app_id", default, deserialize_with = "string_or_number")]
    pub source_app_id: Option<String>,

    #[serde(default)]
    pub metadata: Option<String>,
}

/// Image, audio, video, file, location or template attachment.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,

    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Postback {
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: String,

    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct OptIn {
    /// The `data-ref` of the entry point.
    #[serde(rename = "ref", default, deserialize_with = "null_as_default")]
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AccountLinking {
    /// `linked` or `unlinked`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,

    #[serde(default)]
    pub authorization_code: Option<String>,
}

/// Confirms that messages sent by the page were delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DeliveryReceipt {
    #[serde(rename = "mids", default, deserialize_with = "null_as_default")]
    pub message_ids: Vec<String>,

    /// Every message sent before this timestamp was delivered.
    #[serde(rename = "watermark", default, deserialize_with = "null_as_default")]
    pub watermark_ms: i64,

    #[serde(rename = "seq", default, deserialize_with = "null_as_default")]
    pub sequence_number: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ReadReceipt {
    /// Every message sent before this timestamp was read.
    #[serde(rename = "watermark", default, deserialize_with = "null_as_default")]
    pub watermark_ms: i64,

    #[serde(rename = "seq", default, deserialize_with = "null_as_default")]
    pub sequence_number: i64,
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Deserialize)]
struct RawMessagingEvent {
    sender: Participant,
    recipient: Participant,
    #[serde(default, deserialize_with = "null_as_default")]
    timestamp: i64,
    message: Option<InboundMessage>,
    postback: Option<Postback>,
    optin: Option<OptIn>,
    account_linking: Option<AccountLinking>,
    delivery: Option<DeliveryReceipt>,
    read: Option<ReadReceipt>,
}

impl From<RawMessagingEvent> for MessagingEvent {
    fn from(raw: RawMessagingEvent) -> Self {
        let mut present: Vec<EventKind> = Vec::with_capacity(1);
        present.extend(raw.message.map(EventKind::Message));
        present.extend(raw.postback.map(EventKind::Postback));
        present.extend(raw.optin.map(EventKind::OptIn));
        present.extend(raw.account_linking.map(EventKind::AccountLinking));
        present.extend(raw.delivery.map(EventKind::Delivery));
        present.extend(raw.read.map(EventKind::Read));

        let mut variants = present.into_iter();
        let kind = variants.next().unwrap_or(EventKind::Unclassified);

        let dropped: Vec<&'static str> = variants.map(|k| k.name()).collect();
        if !dropped.is_empty() {
            warn!(
                sender_id = %raw.sender.id,
                kept = kind.name(),
                dropped = ?dropped,
                "Messaging event carries more than one variant; keeping highest priority"
            );
        }

        Self {
            sender: raw.sender,
            recipient: raw.recipient,
            timestamp_ms: raw.timestamp,
            kind,
        }
    }
}

// ============================================================================
// Field Helpers
// ============================================================================

fn quick_reply_payload<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct QuickReply {
        #[serde(default, deserialize_with = "null_as_default")]
        payload: String,
    }

    Ok(Option::<QuickReply>::deserialize(deserializer)?.map(|q| q.payload))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AppId {
        Text(String),
        Number(u64),
    }

    Ok(
        Option::<AppId>::deserialize(deserializer)?.map(|id| match id {
            AppId::Text(s) => s,
            AppId::Number(n) => n.to_string(),
        }),
    )
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

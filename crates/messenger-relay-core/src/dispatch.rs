//! Event dispatch for decoded webhook deliveries.
//!
//! The dispatcher walks a [`Payload`] exactly once, in document order, and
//! reacts to each classified event:
//!
//! | Event kind | Reaction |
//! |------------|----------|
//! | `Message` | generate a reply with the [`Responder`], send it with the [`MessageSender`] |
//! | `Delivery` | acknowledge (log only) |
//! | anything else | ignore (log only) |
//!
//! A failed send is logged and counted but never stops the remaining events,
//! and never turns into a dispatch error: once the object kind is accepted,
//! the webhook caller always gets a `200`.

use crate::error::DispatchError;
use crate::payload::{EventKind, MessagingEvent, Payload, PAGE_OBJECT_KIND};
use crate::responder::Responder;
use crate::sender::MessageSender;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Behaviour switches for [`EventDispatcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherOptions {
    /// Do not answer messages flagged `is_echo`.
    ///
    /// Pages subscribed to `message_echoes` receive their own replies back;
    /// answering those would loop.
    pub skip_echoes: bool,
}

/// Counters for one dispatched delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub entries: usize,
    pub events: usize,
    pub replies_sent: usize,
    pub replies_failed: usize,
    pub deliveries_acknowledged: usize,
    pub echoes_skipped: usize,
    pub ignored: usize,
}

/// Routes classified messaging events to their reactions.
///
/// # Examples
///
/// ```rust,no_run
/// use messenger_relay_core::{
///     payload, EventDispatcher, GraphApiSender, GreetingResponder, SenderConfig,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sender = GraphApiSender::new(&SenderConfig::default(), "page-access-token")?;
/// let dispatcher = EventDispatcher::new(
///     Arc::new(GreetingResponder::default()),
///     Arc::new(sender),
/// );
///
/// let body = br#"{"object":"page","entry":[]}"#;
/// let summary = dispatcher.dispatch(&payload::decode(body)?).await?;
/// assert_eq!(summary.events, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventDispatcher {
    responder: Arc<dyn Responder>,
    sender: Arc<dyn MessageSender>,
    options: DispatcherOptions,
}

impl EventDispatcher {
    pub fn new(responder: Arc<dyn Responder>, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            responder,
            sender,
            options: DispatcherOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DispatcherOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> DispatcherOptions {
        self.options
    }

    /// Dispatch every event in `payload`, in order.
    ///
    /// Entries are processed in array order, and events within an entry in
    /// array order. Sends are awaited one at a time so replies leave in the
    /// same order their messages arrived.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnsupportedObjectKind`] without touching any
    /// event if the payload is not a page delivery. Per-event failures are
    /// reported through the returned [`DispatchSummary`] only.
    #[instrument(
        skip(self, payload),
        fields(object_kind = %payload.object_kind, entries = payload.entries.len())
    )]
    pub async fn dispatch(&self, payload: &Payload) -> Result<DispatchSummary, DispatchError> {
        if !payload.is_page() {
            error!(
                expected = PAGE_OBJECT_KIND,
                "Rejecting webhook delivery with unsupported object kind"
            );
            return Err(DispatchError::UnsupportedObjectKind {
                object_kind: payload.object_kind.clone(),
            });
        }

        let mut summary = DispatchSummary {
            entries: payload.entries.len(),
            ..DispatchSummary::default()
        };

        for (entry_index, entry) in payload.entries.iter().enumerate() {
            debug!(
                entry_index,
                page_id = %entry.source_id,
                time = entry.timestamp_ms,
                events = entry.events.len(),
                "Processing entry"
            );

            if entry.events.is_empty() {
                warn!(
                    entry_index,
                    page_id = %entry.source_id,
                    "Entry carries no messaging events; nothing to dispatch"
                );
                continue;
            }

            for event in &entry.events {
                summary.events += 1;
                self.dispatch_event(event, &mut summary).await;
            }
        }

        info!(
            events = summary.events,
            replies_sent = summary.replies_sent,
            replies_failed = summary.replies_failed,
            deliveries = summary.deliveries_acknowledged,
            echoes_skipped = summary.echoes_skipped,
            ignored = summary.ignored,
            "Webhook delivery dispatched"
        );

        Ok(summary)
    }

    async fn dispatch_event(&self, event: &MessagingEvent, summary: &mut DispatchSummary) {
        let sender_id = event.sender.id.as_str();

        match &event.kind {
            EventKind::Message(message) => {
                if message.is_echo && self.options.skip_echoes {
                    debug!(sender_id, mid = %message.id, "Skipping echoed message");
                    summary.echoes_skipped += 1;
                    return;
                }

                debug!(
                    sender_id,
                    recipient_id = %event.recipient.id,
                    mid = %message.id,
                    seq = message.sequence_number,
                    text_len = message.text.len(),
                    "Message received"
                );

                let reply = self.responder.respond(sender_id, &message.text);

                match self.sender.send(sender_id, &reply).await {
                    Ok(()) => {
                        debug!(sender_id, "Reply sent");
                        summary.replies_sent += 1;
                    }
                    Err(e) => {
                        error!(
                            sender_id,
                            error = %e,
                            transient = e.is_transient(),
                            "Failed to send reply; continuing with remaining events"
                        );
                        summary.replies_failed += 1;
                    }
                }
            }
            EventKind::Delivery(delivery) => {
                debug!(
                    sender_id,
                    mids = ?delivery.message_ids,
                    seq = delivery.sequence_number,
                    watermark = delivery.watermark_ms,
                    "Message delivered"
                );
                summary.deliveries_acknowledged += 1;
            }
            other => {
                debug!(sender_id, kind = other.name(), "Event kind not handled; ignoring");
                summary.ignored += 1;
            }
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;

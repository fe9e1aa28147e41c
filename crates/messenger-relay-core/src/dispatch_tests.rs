//! Tests for EventDispatcher.

use super::*;
use crate::error::SendError;
use crate::payload;
use crate::responder::GreetingResponder;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

// ============================================================================
// Recording Stubs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Respond { sender_id: String, text: String },
    Send { recipient_id: String, text: String },
}

type CallLog = Arc<Mutex<Vec<Call>>>;

/// Responder that records calls into a shared log and delegates to the
/// greeting policy.
struct RecordingResponder {
    log: CallLog,
    inner: GreetingResponder,
}

impl Responder for RecordingResponder {
    fn respond(&self, sender_id: &str, inbound_text: &str) -> String {
        self.log.lock().unwrap().push(Call::Respond {
            sender_id: sender_id.to_string(),
            text: inbound_text.to_string(),
        });
        self.inner.respond(sender_id, inbound_text)
    }
}

/// Sender that records calls into a shared log and fails for chosen
/// recipients.
struct RecordingSender {
    log: CallLog,
    failing_recipients: HashSet<String>,
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), SendError> {
        self.log.lock().unwrap().push(Call::Send {
            recipient_id: recipient_id.to_string(),
            text: text.to_string(),
        });
        if self.failing_recipients.contains(recipient_id) {
            return Err(SendError::Transport {
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

fn dispatcher_with(failing: &[&str]) -> (EventDispatcher, CallLog) {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let responder = RecordingResponder {
        log: log.clone(),
        inner: GreetingResponder::default(),
    };
    let sender = RecordingSender {
        log: log.clone(),
        failing_recipients: failing.iter().map(|s| s.to_string()).collect(),
    };
    (
        EventDispatcher::new(Arc::new(responder), Arc::new(sender)),
        log,
    )
}

fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

fn respond(sender_id: &str, text: &str) -> Call {
    Call::Respond {
        sender_id: sender_id.to_string(),
        text: text.to_string(),
    }
}

fn send(recipient_id: &str, text: &str) -> Call {
    Call::Send {
        recipient_id: recipient_id.to_string(),
        text: text.to_string(),
    }
}

fn message_event(sender_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "sender": {"id": sender_id},
        "recipient": {"id": "P1"},
        "timestamp": 1,
        "message": {"mid": format!("mid.{sender_id}"), "seq": 1, "text": text}
    })
}

fn delivery_event(sender_id: &str) -> serde_json::Value {
    serde_json::json!({
        "sender": {"id": sender_id},
        "recipient": {"id": "P1"},
        "delivery": {"mids": ["mid.1"], "watermark": 10, "seq": 2}
    })
}

fn page_payload(entries: Vec<Vec<serde_json::Value>>) -> Payload {
    let entries: Vec<serde_json::Value> = entries
        .into_iter()
        .enumerate()
        .map(|(i, events)| serde_json::json!({"id": i.to_string(), "time": 100, "messaging": events}))
        .collect();
    let body = serde_json::json!({"object": "page", "entry": entries});
    payload::decode(body.to_string().as_bytes()).expect("payload should decode")
}

// ============================================================================
// Object Kind
// ============================================================================

mod object_kind {
    use super::*;

    #[tokio::test]
    async fn test_non_page_object_is_rejected_without_dispatching() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let body = serde_json::json!({
            "object": "group",
            "entry": [{"id": "1", "messaging": [message_event("U1", "hi")]}]
        });
        let payload = payload::decode(body.to_string().as_bytes()).unwrap();

        let result = dispatcher.dispatch(&payload).await;

        assert_eq!(
            result,
            Err(DispatchError::UnsupportedObjectKind {
                object_kind: "group".to_string()
            })
        );
        assert!(calls(&log).is_empty(), "no event may be dispatched");
    }

    #[tokio::test]
    async fn test_missing_object_is_rejected() {
        let (dispatcher, _log) = dispatcher_with(&[]);
        let payload = payload::decode(b"{}").unwrap();

        let result = dispatcher.dispatch(&payload).await;
        assert!(matches!(
            result,
            Err(DispatchError::UnsupportedObjectKind { ref object_kind }) if object_kind.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_object_kind_is_case_sensitive() {
        let (dispatcher, _log) = dispatcher_with(&[]);
        let payload = payload::decode(br#"{"object":"Page","entry":[]}"#).unwrap();
        assert!(dispatcher.dispatch(&payload).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_page_payload_succeeds() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let payload = page_payload(vec![]);

        let summary = dispatcher.dispatch(&payload).await.unwrap();
        assert_eq!(summary, DispatchSummary::default());
        assert!(calls(&log).is_empty());
    }
}

// ============================================================================
// Message Handling
// ============================================================================

mod messages {
    use super::*;

    #[tokio::test]
    async fn test_scenario_message_is_answered() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let body = br#"{"object":"page","entry":[{"id":"1","time":100,"messaging":[{"sender":{"id":"U1"},"recipient":{"id":"P1"},"message":{"text":"hi"}}]}]}"#;
        let payload = payload::decode(body).unwrap();

        let summary = dispatcher.dispatch(&payload).await.unwrap();

        assert_eq!(calls(&log), vec![respond("U1", "hi"), send("U1", "Hello hi")]);
        assert_eq!(summary.events, 1);
        assert_eq!(summary.replies_sent, 1);
        assert_eq!(summary.replies_failed, 0);
    }

    #[tokio::test]
    async fn test_dispatch_follows_document_order() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let payload = page_payload(vec![
            vec![message_event("A", "1"), message_event("B", "2"), message_event("C", "3")],
            vec![message_event("D", "4"), message_event("E", "5"), message_event("F", "6")],
        ]);

        let summary = dispatcher.dispatch(&payload).await.unwrap();

        let mut expected = Vec::new();
        for (id, text) in [("A", "1"), ("B", "2"), ("C", "3"), ("D", "4"), ("E", "5"), ("F", "6")] {
            expected.push(respond(id, text));
            expected.push(send(id, &format!("Hello {text}")));
        }
        assert_eq!(calls(&log), expected);
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.events, 6);
        assert_eq!(summary.replies_sent, 6);
    }

    #[tokio::test]
    async fn test_send_failure_does_not_block_sibling_events() {
        let (dispatcher, log) = dispatcher_with(&["U1"]);
        let payload = page_payload(vec![vec![
            message_event("U1", "first"),
            message_event("U2", "second"),
        ]]);

        let result = dispatcher.dispatch(&payload).await;

        let summary = result.expect("send failures must not fail the dispatch");
        assert_eq!(
            calls(&log),
            vec![
                respond("U1", "first"),
                send("U1", "Hello first"),
                respond("U2", "second"),
                send("U2", "Hello second"),
            ]
        );
        assert_eq!(summary.replies_failed, 1);
        assert_eq!(summary.replies_sent, 1);
    }

    #[tokio::test]
    async fn test_send_failure_does_not_block_later_entries() {
        let (dispatcher, log) = dispatcher_with(&["U1"]);
        let payload = page_payload(vec![
            vec![message_event("U1", "a")],
            vec![message_event("U2", "b")],
        ]);

        dispatcher.dispatch(&payload).await.unwrap();
        assert_eq!(calls(&log).last(), Some(&send("U2", "Hello b")));
    }

    #[tokio::test]
    async fn test_message_without_text_is_answered_with_empty_text() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let payload = page_payload(vec![vec![serde_json::json!({
            "sender": {"id": "U1"},
            "recipient": {"id": "P1"},
            "message": {"mid": "m", "attachments": [{"type": "image", "payload": {"url": "u"}}]}
        })]]);

        dispatcher.dispatch(&payload).await.unwrap();
        assert_eq!(calls(&log), vec![respond("U1", ""), send("U1", "Hello ")]);
    }
}

// ============================================================================
// Non-Message Events
// ============================================================================

mod other_events {
    use super::*;

    #[tokio::test]
    async fn test_delivery_only_event_triggers_no_calls() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let payload = page_payload(vec![vec![delivery_event("U1")]]);

        let summary = dispatcher.dispatch(&payload).await.unwrap();

        assert!(calls(&log).is_empty());
        assert_eq!(summary.deliveries_acknowledged, 1);
        assert_eq!(summary.replies_sent, 0);
    }

    #[tokio::test]
    async fn test_unhandled_kinds_are_ignored_without_error() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let base = |key: &str, value: serde_json::Value| {
            let mut event = serde_json::json!({"sender": {"id": "U1"}, "recipient": {"id": "P1"}});
            event[key] = value;
            event
        };
        let payload = page_payload(vec![vec![
            base("postback", serde_json::json!({"payload": "GET_STARTED"})),
            base("optin", serde_json::json!({"ref": "r"})),
            base("account_linking", serde_json::json!({"status": "unlinked"})),
            base("read", serde_json::json!({"watermark": 1})),
            serde_json::json!({"sender": {"id": "U1"}, "recipient": {"id": "P1"}}),
        ]]);

        let summary = dispatcher.dispatch(&payload).await.unwrap();

        assert!(calls(&log).is_empty());
        assert_eq!(summary.events, 5);
        assert_eq!(summary.ignored, 5);
    }

    #[tokio::test]
    async fn test_mixed_events_only_answer_messages() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let payload = page_payload(vec![vec![
            delivery_event("U1"),
            message_event("U2", "yo"),
            delivery_event("U3"),
        ]]);

        let summary = dispatcher.dispatch(&payload).await.unwrap();

        assert_eq!(calls(&log), vec![respond("U2", "yo"), send("U2", "Hello yo")]);
        assert_eq!(summary.deliveries_acknowledged, 2);
        assert_eq!(summary.replies_sent, 1);
    }

    #[tokio::test]
    async fn test_entry_without_events_is_skipped() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let payload = page_payload(vec![vec![], vec![message_event("U1", "hi")]]);

        let summary = dispatcher.dispatch(&payload).await.unwrap();

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.events, 1);
        assert_eq!(calls(&log).len(), 2);
    }

    #[tokio::test]
    async fn test_multi_variant_event_acts_on_highest_priority_only() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let mut event = message_event("U1", "hi");
        event["delivery"] = serde_json::json!({"mids": ["x"], "watermark": 1});
        let payload = page_payload(vec![vec![event]]);

        let summary = dispatcher.dispatch(&payload).await.unwrap();

        assert_eq!(calls(&log), vec![respond("U1", "hi"), send("U1", "Hello hi")]);
        assert_eq!(summary.replies_sent, 1);
        assert_eq!(summary.deliveries_acknowledged, 0);
    }
}

// ============================================================================
// Echo Handling
// ============================================================================

mod echoes {
    use super::*;

    fn echo_event() -> serde_json::Value {
        serde_json::json!({
            "sender": {"id": "P1"},
            "recipient": {"id": "U1"},
            "message": {"is_echo": true, "app_id": 1517776481860111u64, "mid": "m", "text": "Hello hi"}
        })
    }

    #[tokio::test]
    async fn test_echoes_are_answered_by_default() {
        let (dispatcher, log) = dispatcher_with(&[]);
        assert!(!dispatcher.options().skip_echoes);

        dispatcher
            .dispatch(&page_payload(vec![vec![echo_event()]]))
            .await
            .unwrap();

        assert_eq!(calls(&log).len(), 2);
    }

    #[tokio::test]
    async fn test_echoes_are_skipped_when_configured() {
        let (dispatcher, log) = dispatcher_with(&[]);
        let dispatcher = dispatcher.with_options(DispatcherOptions { skip_echoes: true });

        let summary = dispatcher
            .dispatch(&page_payload(vec![vec![echo_event(), message_event("U1", "hi")]]))
            .await
            .unwrap();

        assert_eq!(calls(&log), vec![respond("U1", "hi"), send("U1", "Hello hi")]);
        assert_eq!(summary.echoes_skipped, 1);
        assert_eq!(summary.replies_sent, 1);
    }
}

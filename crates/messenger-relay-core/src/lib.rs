//! # Messenger Relay Core
//!
//! Core logic for the Messenger webhook relay: decoding webhook deliveries,
//! verifying the subscription handshake, dispatching classified events, and
//! sending replies through the platform's Send API.
//!
//! ## Architecture
//!
//! - The HTTP transport lives in `messenger-relay-api`; this crate never sees
//!   a request object, only query values and body bytes
//! - Reply generation and outbound delivery sit behind the [`Responder`] and
//!   [`MessageSender`] traits so the dispatcher can be exercised with stubs
//! - Every value is request-scoped; nothing here holds mutable state
//!
//! ## Usage
//!
//! ```rust
//! use messenger_relay_core::payload;
//! use messenger_relay_core::verification::verify_subscription;
//!
//! let challenge = verify_subscription("subscribe", "secret", "1158201444", "secret").unwrap();
//! assert_eq!(challenge, "1158201444");
//!
//! let body = br#"{"object":"page","entry":[]}"#;
//! let decoded = payload::decode(body).unwrap();
//! assert_eq!(decoded.object_kind, "page");
//! ```

pub mod dispatch;
pub mod error;
pub mod payload;
pub mod responder;
pub mod sender;
pub mod verification;

pub use dispatch::{DispatchSummary, DispatcherOptions, EventDispatcher};
pub use error::{CodecError, DispatchError, SendError, VerificationError};
pub use payload::{
    Entry, EventKind, InboundMessage, MessagingEvent, OutboundEnvelope, Participant, Payload,
};
pub use responder::{GreetingResponder, Responder};
pub use sender::{GraphApiSender, MessageSender, SenderConfig};
pub use verification::verify_subscription;

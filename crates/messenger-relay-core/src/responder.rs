//! Reply generation.

/// Produces the reply text for an inbound message.
///
/// Implementations must be pure: no I/O and no failure mode. This is the
/// extension point for anything smarter than a greeting.
pub trait Responder: Send + Sync {
    fn respond(&self, sender_id: &str, inbound_text: &str) -> String;
}

/// Replies with a fixed greeting followed by the inbound text.
///
/// # Examples
///
/// ```rust
/// use messenger_relay_core::{GreetingResponder, Responder};
///
/// let responder = GreetingResponder::default();
/// assert_eq!(responder.respond("U1", "hi"), "Hello hi");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetingResponder {
    greeting: String,
}

impl GreetingResponder {
    pub const DEFAULT_GREETING: &'static str = "Hello";

    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
        }
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }
}

impl Default for GreetingResponder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GREETING)
    }
}

impl Responder for GreetingResponder {
    fn respond(&self, _sender_id: &str, inbound_text: &str) -> String {
        format!("{} {}", self.greeting, inbound_text)
    }
}

#[cfg(test)]
#[path = "responder_tests.rs"]
mod tests;

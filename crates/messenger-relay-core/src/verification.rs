//! Subscription handshake verification.
//!
//! When a callback URL is registered, the platform sends a `GET` carrying
//! `hub.mode`, `hub.verify_token` and `hub.challenge`. The relay proves it
//! controls the URL by echoing the challenge, but only when the mode is
//! `subscribe` and the token matches the configured verify token.

use crate::error::VerificationError;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// The only handshake mode the relay accepts.
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Verify a subscription handshake and return the challenge to echo.
///
/// The token is checked before the mode. The token comparison runs in
/// constant time.
///
/// # Arguments
///
/// * `mode` - Value of `hub.mode`
/// * `token` - Value of `hub.verify_token`
/// * `challenge` - Value of `hub.challenge`, returned unchanged on success
/// * `expected_token` - The configured verify token
///
/// # Errors
///
/// * [`VerificationError::InvalidToken`] if `token` differs from `expected_token`,
///   or if `expected_token` is empty
/// * [`VerificationError::InvalidMode`] if `mode` is not `subscribe`
///
/// # Examples
///
/// ```rust
/// use messenger_relay_core::verification::verify_subscription;
/// use messenger_relay_core::VerificationError;
///
/// assert_eq!(verify_subscription("subscribe", "t", "XYZ", "t").unwrap(), "XYZ");
/// assert_eq!(
///     verify_subscription("subscribe", "wrong", "XYZ", "t"),
///     Err(VerificationError::InvalidToken)
/// );
/// ```
pub fn verify_subscription<'a>(
    mode: &str,
    token: &str,
    challenge: &'a str,
    expected_token: &str,
) -> Result<&'a str, VerificationError> {
    if !tokens_match(token, expected_token) {
        warn!(mode = %mode, "Subscription handshake rejected: bad verify token");
        return Err(VerificationError::InvalidToken);
    }

    if mode != SUBSCRIBE_MODE {
        warn!(mode = %mode, "Subscription handshake rejected: bad mode");
        return Err(VerificationError::InvalidMode {
            mode: mode.to_string(),
        });
    }

    debug!(challenge_len = challenge.len(), "Subscription handshake verified");
    Ok(challenge)
}

// An unconfigured token never matches, not even an empty one.
fn tokens_match(provided: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}

#[cfg(test)]
#[path = "verification_tests.rs"]
mod tests;

//! Tests for error classification and messages.

use super::*;

fn json_error() -> serde_json::Error {
    serde_json::from_str::<u32>("not-a-number").unwrap_err()
}

mod send_error_tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_transient() {
        let error = SendError::Transport {
            message: "connection refused".to_string(),
        };
        assert!(error.is_transient());
    }

    #[test]
    fn test_server_errors_and_rate_limits_are_transient() {
        for status in [500, 502, 503, 429] {
            let error = SendError::Platform {
                status,
                body: "{}".to_string(),
            };
            assert!(error.is_transient(), "status {status} should be transient");
        }
    }

    #[test]
    fn test_client_errors_are_permanent() {
        for status in [400, 401, 403, 404] {
            let error = SendError::Platform {
                status,
                body: "{}".to_string(),
            };
            assert!(!error.is_transient(), "status {status} should be permanent");
        }
    }

    #[test]
    fn test_encode_errors_are_permanent() {
        let error = SendError::from(CodecError::Encode(json_error()));
        assert!(!error.is_transient());
        assert!(error.to_string().starts_with("Encoding failed"));
    }

    #[test]
    fn test_configuration_errors_are_permanent() {
        let error = SendError::Configuration {
            message: "invalid Send API URL".to_string(),
        };
        assert!(!error.is_transient());
    }

    #[test]
    fn test_platform_error_message_includes_status_and_body() {
        let error = SendError::Platform {
            status: 400,
            body: r#"{"error":{"code":100}}"#.to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("400"));
        assert!(message.contains(r#""code":100"#));
    }
}

mod verification_error_tests {
    use super::*;

    #[test]
    fn test_invalid_mode_names_the_mode() {
        let error = VerificationError::InvalidMode {
            mode: "unsubscribe".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid subscription mode: unsubscribe");
    }

    #[test]
    fn test_invalid_token_does_not_echo_token() {
        assert_eq!(
            VerificationError::InvalidToken.to_string(),
            "Invalid verification token"
        );
    }
}

#[test]
fn test_unsupported_object_kind_message_quotes_kind() {
    let error = DispatchError::UnsupportedObjectKind {
        object_kind: "group".to_string(),
    };
    assert_eq!(error.to_string(), r#"Unsupported object kind: "group""#);
}

#[test]
fn test_decode_error_message_has_prefix() {
    let error = CodecError::Decode(json_error());
    assert!(error
        .to_string()
        .starts_with("Failed to decode webhook payload:"));
}

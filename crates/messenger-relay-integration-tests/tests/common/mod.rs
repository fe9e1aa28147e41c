//! Common test utilities for messenger-relay integration tests
//!
//! This module provides:
//! - A relay router wired exactly as the service wires it, pointed at a mock
//!   Graph API
//! - Builders for webhook delivery bodies
//! - Helpers for inspecting what reached the mock Send API

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use messenger_relay_api::{create_router, AppState, ServiceConfig};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

pub const VERIFY_TOKEN: &str = "integration-verify-token";
pub const PAGE_ACCESS_TOKEN: &str = "integration-page-token";
pub const PAGE_ID: &str = "P1";
pub const SEND_API_PATH: &str = "/v2.6/me/messages";

// ============================================================================
// Relay setup
// ============================================================================

/// Service configuration pointing the Send API client at `graph_api_url`.
pub fn relay_config(graph_api_url: &str) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.messenger.verify_token = VERIFY_TOKEN.to_string();
    config.messenger.page_access_token = PAGE_ACCESS_TOKEN.to_string();
    config.messenger.graph_api_url = graph_api_url.to_string();
    config.messenger.send_timeout_seconds = 2;
    config
}

/// Build the production router for `config`.
pub fn relay_router(config: ServiceConfig) -> Router {
    let state = AppState::from_config(config).expect("relay wiring should succeed");
    create_router(state)
}

/// A mock Graph API that accepts every Send API call.
pub async fn accepting_graph_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_API_PATH))
        .and(query_param("access_token", PAGE_ACCESS_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "recipient_id": "U1",
            "message_id": "mid.reply"
        })))
        .mount(&server)
        .await;
    server
}

// ============================================================================
// Requests
// ============================================================================

pub async fn call(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    post_raw(uri, body.to_string())
}

pub fn post_raw(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

// ============================================================================
// Delivery builders
// ============================================================================

pub fn text_message(sender: &str, text: &str) -> Value {
    json!({
        "sender": { "id": sender },
        "recipient": { "id": PAGE_ID },
        "timestamp": 1458692752478u64,
        "message": {
            "mid": format!("mid.{sender}.{text}"),
            "seq": 73,
            "text": text
        }
    })
}

pub fn delivery_receipt(sender: &str) -> Value {
    json!({
        "sender": { "id": sender },
        "recipient": { "id": PAGE_ID },
        "delivery": {
            "mids": ["mid.1458668856218:ed81099e15d3f4f233"],
            "watermark": 1458668856253u64,
            "seq": 37
        }
    })
}

pub fn entry(events: Vec<Value>) -> Value {
    json!({ "id": PAGE_ID, "time": 1458692752478u64, "messaging": events })
}

pub fn page_delivery(entries: Vec<Value>) -> Value {
    json!({ "object": "page", "entry": entries })
}

// ============================================================================
// Send API inspection
// ============================================================================

/// JSON bodies of every request the mock Graph API received, in order.
pub async fn sent_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).expect("Send API body is JSON"))
        .collect()
}

pub fn reply(recipient: &str, text: &str) -> Value {
    json!({ "recipient": { "id": recipient }, "message": { "text": text } })
}

//! # Messenger Relay HTTP Service
//!
//! HTTP transport for the Messenger webhook relay.
//!
//! This service provides:
//! - The callback endpoint: `GET` answers the subscription handshake, `POST`
//!   accepts webhook deliveries and hands them to the [`EventDispatcher`]
//! - A health check endpoint
//!
//! Request handling is stateless apart from the read-only [`AppState`];
//! deliveries are processed independently and may overlap.

pub mod config;
pub mod errors;

pub use config::{LoggingConfig, MessengerConfig, ServerConfig, ServiceConfig};
pub use errors::{CallbackError, ConfigError, ServiceError};

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use messenger_relay_core::{
    payload, verify_subscription, EventDispatcher, GraphApiSender, GreetingResponder,
};
use serde::{Deserialize, Serialize};
use std::{future::IntoFuture, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Dispatcher for decoded deliveries
    pub dispatcher: Arc<EventDispatcher>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServiceConfig, dispatcher: EventDispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Build the production wiring: a [`GreetingResponder`] and a
    /// [`GraphApiSender`] configured from `config.messenger`.
    pub fn from_config(config: ServiceConfig) -> Result<Self, ServiceError> {
        let messenger = &config.messenger;

        let sender = GraphApiSender::new(
            &messenger.sender_config(),
            messenger.page_access_token.clone(),
        )?;
        info!(endpoint = %sender.endpoint(), "Send API client configured");

        let dispatcher = EventDispatcher::new(
            Arc::new(GreetingResponder::new(messenger.greeting.clone())),
            Arc::new(sender),
        )
        .with_options(messenger.dispatcher_options());

        Ok(Self::new(config, dispatcher))
    }
}

// ============================================================================
// Router
// ============================================================================

/// Create the HTTP router.
///
/// Any method other than `GET` or `POST` on the callback path is answered
/// with `405 Method Not Allowed`. Bodies larger than
/// `server.max_body_size` are answered with `413 Payload Too Large`.
pub fn create_router(state: AppState) -> Router {
    let callback_path = state.config.messenger.callback_path.clone();
    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .route(
            &callback_path,
            get(handle_callback_verification).post(handle_callback_delivery),
        )
        .route("/health", get(handle_health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body_size)),
        )
        .with_state(state)
}

/// Bind the configured address and serve until SIGINT or SIGTERM.
///
/// After the signal, in-flight requests get `server.shutdown_timeout_seconds`
/// to finish before the server returns anyway.
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let server_config = state.config.server.clone();
    let address = format!("{}:{}", server_config.host, server_config.port);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(
        address = %address,
        callback_path = %state.config.messenger.callback_path,
        "Starting HTTP server"
    );

    let app = create_router(state);
    let shutdown_timeout = Duration::from_secs(server_config.shutdown_timeout_seconds);
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Shutdown signal received; draining in-flight requests"
            );
            let _ = signalled_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        _ = signalled_rx => {
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        timeout_seconds = shutdown_timeout.as_secs(),
                        "In-flight requests did not finish before the shutdown timeout"
                    );
                    Ok(())
                }
            }
        }
    };

    result.map_err(|e| ServiceError::ServerFailed {
        message: e.to_string(),
    })?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Query parameters of the subscription handshake.
///
/// Absent parameters are treated as empty strings, which never verify.
#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    #[serde(rename = "hub.mode", default)]
    pub mode: String,

    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: String,

    #[serde(rename = "hub.challenge", default)]
    pub challenge: String,
}

/// Answer the subscription handshake by echoing `hub.challenge`.
#[instrument(skip(state, query), fields(mode = %query.mode))]
async fn handle_callback_verification(
    State(state): State<AppState>,
    Query(query): Query<VerificationQuery>,
) -> Result<String, CallbackError> {
    let challenge = verify_subscription(
        &query.mode,
        &query.verify_token,
        &query.challenge,
        &state.config.messenger.verify_token,
    )?;

    info!("Subscription handshake verified");
    Ok(challenge.to_string())
}

/// Decode and dispatch one webhook delivery.
///
/// Returns `200` with an empty body once the delivery is accepted, even if
/// individual replies failed to send.
#[instrument(
    skip(state, body),
    fields(
        delivery_id = %uuid::Uuid::new_v4(),
        body_size = body.len(),
        events = tracing::field::Empty
    )
)]
async fn handle_callback_delivery(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, CallbackError> {
    let payload = payload::decode(&body).inspect_err(|_| {
        debug!(body = %String::from_utf8_lossy(&body), "Undecodable delivery body");
    })?;
    tracing::Span::current().record("events", payload.event_count());

    let summary = state.dispatcher.dispatch(&payload).await?;

    if summary.replies_failed > 0 {
        warn!(
            replies_failed = summary.replies_failed,
            "Delivery accepted with failed replies"
        );
    }

    Ok(StatusCode::OK)
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use messenger_relay_core::{DispatcherOptions, SenderConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Platform credentials and relay behaviour
    pub messenger: MessengerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    ///
    /// Empty tokens are accepted with a warning: the relay still starts, and
    /// the problem surfaces as rejected handshakes or failed sends.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                field: "server.max_body_size".to_string(),
                message: "maximum body size must be non-zero".to_string(),
            });
        }

        self.messenger.validate()?;

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::Invalid {
                field: "logging.level".to_string(),
                message: format!("unknown log level '{}'", self.logging.level),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Time allowed for in-flight requests to finish after a shutdown signal
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Messenger platform configuration
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MessengerConfig {
    /// Path serving both the handshake (GET) and deliveries (POST)
    pub callback_path: String,

    /// Token expected in `hub.verify_token`
    pub verify_token: String,

    /// Page access token for the Send API
    pub page_access_token: String,

    /// Graph API base URL
    pub graph_api_url: String,

    /// Graph API version segment
    pub api_version: String,

    /// Send API request timeout in seconds
    pub send_timeout_seconds: u64,

    /// Word prefixed to every reply
    pub greeting: String,

    /// Do not answer echoes of the page's own messages
    pub skip_echoes: bool,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        let sender = SenderConfig::default();
        Self {
            callback_path: "/callback".to_string(),
            verify_token: String::new(),
            page_access_token: String::new(),
            graph_api_url: sender.graph_api_url,
            api_version: sender.api_version,
            send_timeout_seconds: sender.timeout.as_secs(),
            greeting: "Hello".to_string(),
            skip_echoes: false,
        }
    }
}

impl MessengerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.callback_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "messenger.callback_path".to_string(),
                message: format!("path must start with '/': '{}'", self.callback_path),
            });
        }

        if self.callback_path == "/health" {
            return Err(ConfigError::Invalid {
                field: "messenger.callback_path".to_string(),
                message: "'/health' is reserved for the health check".to_string(),
            });
        }

        if self.graph_api_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "messenger.graph_api_url".to_string(),
                message: "Graph API URL must not be empty".to_string(),
            });
        }

        if self.send_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "messenger.send_timeout_seconds".to_string(),
                message: "send timeout must be non-zero".to_string(),
            });
        }

        if self.verify_token.is_empty() {
            warn!("messenger.verify_token is empty; subscription handshakes will be rejected");
        }

        if self.page_access_token.is_empty() {
            warn!("messenger.page_access_token is empty; replies will be rejected by the platform");
        }

        Ok(())
    }

    /// Settings for the outbound Send API client.
    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig::default()
            .with_graph_api_url(self.graph_api_url.clone())
            .with_api_version(self.api_version.clone())
            .with_timeout(Duration::from_secs(self.send_timeout_seconds))
    }

    /// Settings for the event dispatcher.
    pub fn dispatcher_options(&self) -> DispatcherOptions {
        DispatcherOptions {
            skip_echoes: self.skip_echoes,
        }
    }
}

impl std::fmt::Debug for MessengerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessengerConfig")
            .field("callback_path", &self.callback_path)
            .field("verify_token", &"<REDACTED>")
            .field("page_access_token", &"<REDACTED>")
            .field("graph_api_url", &self.graph_api_url)
            .field("api_version", &self.api_version)
            .field("send_timeout_seconds", &self.send_timeout_seconds)
            .field("greeting", &self.greeting)
            .field("skip_echoes", &self.skip_echoes)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

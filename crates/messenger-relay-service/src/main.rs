//! # Messenger Relay Service
//!
//! Binary entry point for the Messenger webhook relay.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Builds the responder, Send API client and dispatcher
//! - Starts the HTTP server from messenger-relay-api

use anyhow::Context;
use messenger_relay_api::{start_server, AppState, LoggingConfig, ServiceConfig};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable naming an extra configuration file.
const CONFIG_FILE_ENV: &str = "RELAY_CONFIG_FILE";

/// Prefix for configuration overrides, e.g. `RELAY__SERVER__PORT=9090`.
const ENV_PREFIX: &str = "RELAY";

/// Exit code for configuration that cannot be loaded or is invalid.
const EXIT_CONFIG: i32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let explicit_path = std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|path| !path.is_empty());

    let service_config = match load_config(explicit_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            error!(error = %e, "Failed to load service configuration; aborting");
            std::process::exit(EXIT_CONFIG);
        }
    };

    init_logging(&service_config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Messenger Relay Service");

    if let Some(path) = &explicit_path {
        info!(path = %path, "Loaded configuration from explicit path");
    }

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(EXIT_CONFIG);
    }

    let state = AppState::from_config(service_config).context("failed to wire the relay")?;

    start_server(state).await.context("HTTP server failed")?;

    info!("Messenger Relay Service stopped");
    Ok(())
}

/// Load configuration, later sources overriding earlier ones:
///
/// 1. `/etc/messenger-relay/service.yaml`
/// 2. `./config/service.yaml`
/// 3. `explicit_path`, which must exist when given
/// 4. `RELAY__`-prefixed environment variables with `__` separators
///
/// Every field has a default, so an unconfigured environment still produces
/// a usable config. A malformed file or an uncoercible variable is an error.
fn load_config(explicit_path: Option<&str>) -> Result<ServiceConfig, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/messenger-relay/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = explicit_path {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()
}

/// `RUST_LOG` wins when set; otherwise the configured level applies.
fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

fn init_logging(logging: &LoggingConfig) {
    let json = logging.json_format;

    tracing_subscriber::registry()
        .with(env_filter(logging))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

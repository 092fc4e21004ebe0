//! Ordered startup: config, observability, state, listener.

use std::net::SocketAddr;
use std::path::Path;

use tokio::net::TcpListener;

use crate::config::{load_config, load_from_env, ServiceConfig};
use crate::error::Error;
use crate::http::AppState;
use crate::observability::{logging, metrics};

/// Everything the server needs to start accepting connections.
pub struct Startup {
    pub state: AppState,
    pub listener: TcpListener,
}

/// Load configuration from `path` (or defaults), overlaying the environment.
pub fn load(path: Option<&Path>) -> Result<ServiceConfig, Error> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };
    Ok(config)
}

/// Initialize observability, build state and bind the listener.
pub async fn start(config: ServiceConfig) -> Result<Startup, Error> {
    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.server.bind_address,
        fail_threshold = config.circuit_breaker.fail_threshold,
        reset_timeout_secs = config.circuit_breaker.reset_timeout_secs,
        rate_limit_capacity = config.rate_limit.capacity,
        rate_limit_window_secs = config.rate_limit.window_secs,
        storage = ?config.rate_limit.storage,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let state = AppState::from_config(config).await?;

    Ok(Startup { state, listener })
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build shared application state (breaker registry, rate limiter)
//! - Create the Axum router with service, drill and admin routes
//! - Wire up middleware (tracing, timeout, rate limiting on `/health`)
//! - Run background tasks and serve until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::ServiceConfig;
use crate::error::Error;
use crate::http::drill;
use crate::resilience::BreakerRegistry;
use crate::security::{rate_limit_middleware, RateLimiter};
use crate::storage::{BucketSweeper, StorageBackend};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BreakerRegistry>,
    pub limiter: Arc<RateLimiter<StorageBackend>>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// Build state from a validated configuration.
    ///
    /// Connects to the shared store when one is configured.
    pub async fn from_config(config: ServiceConfig) -> Result<Self, Error> {
        let registry = BreakerRegistry::new(&config.circuit_breaker)?;
        let storage = StorageBackend::from_config(&config.rate_limit).await?;
        let limiter = RateLimiter::from_config(&config.rate_limit, storage)?;

        Ok(Self {
            registry: Arc::new(registry),
            limiter: Arc::new(limiter),
            config: Arc::new(config),
        })
    }
}

#[derive(Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
}

/// HTTP server for the service.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(state: AppState) -> Router {
        let config = Arc::clone(&state.config);

        // Only `/health` is rate limited; `/status` is not.
        let mut app = Router::new().route("/health", get(health));
        if config.rate_limit.enabled {
            app = app.route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            ));
        }

        let mut app = app
            .route("/", get(root))
            .route("/status", get(status))
            .route("/cb/call", get(drill::call))
            .route("/cb/state", get(drill::state));
        if config.admin.enabled {
            app = app.merge(setup_admin_router(state.clone()));
        }

        app.with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let config = Arc::clone(&self.state.config);
        if config.rate_limit.enabled {
            let sweeper = BucketSweeper::new(
                Arc::clone(&self.state.limiter),
                Duration::from_secs(config.rate_limit.sweep_interval_secs),
            );
            tokio::spawn(sweeper.run(shutdown.resubscribe()));
        }

        let app = Self::router(self.state).into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "health": "Ok" }))
}

async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "Ok" }))
}

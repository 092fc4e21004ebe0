//! Fixed-window rate limiting.
//!
//! Each key has one counter that resets, and opens a new window, when the
//! window has expired at increment time. Across a window boundary up to
//! `2 × capacity` requests can be admitted; that burst is accepted in exchange
//! for a single atomic increment per check.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::RateLimitConfig;
use crate::error::{ConfigurationError, LimitError, RateLimitExceeded, StorageUnavailable};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::storage::Storage;

/// Weight added per admission check.
const REQUEST_WEIGHT: f64 = 1.0;

/// Per-key admission control over a pluggable counter store.
#[derive(Debug)]
pub struct RateLimiter<S> {
    capacity: u32,
    window: Duration,
    storage: S,
}

impl<S: Storage> RateLimiter<S> {
    /// Create a limiter; zero capacity or a zero window is rejected.
    pub fn new(capacity: u32, window: Duration, storage: S) -> Result<Self, ConfigurationError> {
        if capacity == 0 {
            return Err(ConfigurationError::new("capacity", "must be positive"));
        }
        if window.is_zero() {
            return Err(ConfigurationError::new("window", "must be a positive duration"));
        }
        Ok(Self {
            capacity,
            window,
            storage,
        })
    }

    pub fn from_config(config: &RateLimitConfig, storage: S) -> Result<Self, ConfigurationError> {
        Self::new(config.capacity, config.window(), storage)
    }

    /// Count one request against `key`; true if it is within capacity.
    pub async fn allow(&self, key: &str) -> Result<bool, StorageUnavailable> {
        let increment = self.storage.increment(key, REQUEST_WEIGHT, self.window).await?;
        if increment.fresh_window {
            tracing::trace!(key, "Rate-limit window opened");
        }
        Ok(increment.count <= f64::from(self.capacity))
    }

    /// Like [`allow`](Self::allow), with a denial reported as an error.
    pub async fn check(&self, key: &str) -> Result<(), LimitError> {
        if self.allow(key).await? {
            Ok(())
        } else {
            Err(RateLimitExceeded {
                key: key.to_string(),
            }
            .into())
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

/// Middleware admitting or rejecting requests per client IP.
///
/// When the counter store is unavailable, `rate_limit.fail_open` decides.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&request);

    match state.limiter.check(&key).await {
        Ok(()) => {
            metrics::record_rate_limit("allowed");
            next.run(request).await
        }
        Err(LimitError::Exceeded(_)) => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            metrics::record_rate_limit("denied");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "detail": "Rate limit exceeded" })),
            )
                .into_response()
        }
        Err(LimitError::Unavailable(e)) => {
            metrics::record_rate_limit("storage_error");
            if state.config.rate_limit.fail_open {
                tracing::error!(client = %key, error = %e, "Rate-limit store unavailable, admitting");
                next.run(request).await
            } else {
                tracing::error!(client = %key, error = %e, "Rate-limit store unavailable, rejecting");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({ "detail": "Rate limiter unavailable" })),
                )
                    .into_response()
            }
        }
    }
}

fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

//! Breaker drill endpoints.
//!
//! `/cb/call` guards a deliberately failing upstream with the `demo` breaker
//! so operators can watch it open, reject and recover.

use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::CallError;
use crate::http::server::AppState;

/// Name of the breaker the drill endpoints exercise.
pub const DEMO_BREAKER: &str = "demo";

#[derive(Debug)]
struct UpstreamFailure;

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("upstream failure")
    }
}

async fn flaky_upstream() -> Result<serde_json::Value, UpstreamFailure> {
    tokio::time::sleep(Duration::from_millis(100)).await;
    Err(UpstreamFailure)
}

pub async fn call(State(state): State<AppState>) -> Response {
    let breaker = state.registry.get(DEMO_BREAKER);

    match breaker.guard(flaky_upstream).await {
        Ok(body) => Json(body).into_response(),
        Err(CallError::Open(err)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "detail": format!("Circuit breaker {}! Service is down now.", err.state),
            })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "detail": err.to_string() })),
        )
            .into_response(),
    }
}

pub async fn state(State(state): State<AppState>) -> Json<serde_json::Value> {
    let current = state.registry.state_of(DEMO_BREAKER);
    Json(json!({ "state": current }))
}

//! Shared helpers for integration tests.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use breakwater::config::ServiceConfig;
use breakwater::http::{AppState, HttpServer};
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key";

/// Small thresholds so scenarios stay short.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.circuit_breaker.fail_threshold = 3;
    config.circuit_breaker.reset_timeout_secs = 30;
    config.rate_limit.capacity = 5;
    config.rate_limit.window_secs = 60;
    config.admin.api_key = ADMIN_KEY.to_string();
    config
}

pub async fn test_router(config: ServiceConfig) -> (Router, AppState) {
    let state = AppState::from_config(config).await.unwrap();
    (HttpServer::router(state.clone()), state)
}

/// Build a request that appears to come from `ip`.
pub fn request(method: Method, uri: &str, ip: [u8; 4]) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    req
}

#[allow(dead_code)]
pub fn admin_request(method: Method, uri: &str) -> Request<Body> {
    let mut req = request(method, uri, [127, 0, 0, 1]);
    req.headers_mut().insert(
        "authorization",
        format!("Bearer {}", ADMIN_KEY).parse().unwrap(),
    );
    req
}

/// Send `req` through `router`, returning status and JSON body (Null if empty).
pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

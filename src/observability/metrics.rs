//! Metrics collection and exposition.
//!
//! # Metrics
//! - `breaker_transitions_total` (counter): state changes by breaker, target state
//! - `breaker_calls_total` (counter): guarded call outcomes by breaker
//! - `breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `rate_limit_decisions_total` (counter): allowed / denied / storage_error
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - Prometheus exporter is opt-in via `observability.metrics_enabled`

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a breaker state change.
pub fn record_transition(breaker: &str, to: CircuitState) {
    counter!(
        "breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("breaker_state", "breaker" => breaker.to_string()).set(state_value(to));
}

/// Record the outcome of a guarded call.
pub fn record_call(breaker: &str, outcome: &'static str) {
    counter!(
        "breaker_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record an admission decision.
pub fn record_rate_limit(decision: &'static str) {
    counter!("rate_limit_decisions_total", "decision" => decision).increment(1);
}

fn state_value(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    }
}

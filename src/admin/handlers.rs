use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::resilience::{BreakerSnapshot, CircuitState, ForcedState};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub breakers: usize,
    pub open_breakers: usize,
    pub rate_limit_capacity: u32,
    pub rate_limit_window_secs: u64,
}

#[derive(Serialize)]
pub struct ForcedResponse {
    pub name: String,
    pub state: CircuitState,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let snapshots = state.registry.snapshots();
    let open_breakers = snapshots
        .iter()
        .filter(|s| s.state == CircuitState::Open)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        breakers: snapshots.len(),
        open_breakers,
        rate_limit_capacity: state.limiter.capacity(),
        rate_limit_window_secs: state.limiter.window().as_secs(),
    })
}

pub async fn list_breakers(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.registry.snapshots())
}

pub async fn get_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, StatusCode> {
    state
        .registry
        .find(&name)
        .map(|breaker| Json(breaker.snapshot()))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn open_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ForcedResponse> {
    force(&state, name, ForcedState::Open)
}

pub async fn close_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ForcedResponse> {
    force(&state, name, ForcedState::Closed)
}

fn force(state: &AppState, name: String, target: ForcedState) -> Json<ForcedResponse> {
    let snapshot = state.registry.force_state(&name, target);
    Json(ForcedResponse {
        name: snapshot.name,
        state: snapshot.state,
    })
}

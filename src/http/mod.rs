//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → security::rate_limit (per-IP admission, `/health` only)
//!     → drill.rs (breaker drill endpoints) | admin (breaker overrides)
//!     → Send to client
//! ```

pub mod drill;
pub mod server;

pub use server::{AppState, HttpServer};

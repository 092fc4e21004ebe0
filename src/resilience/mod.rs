//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → registry.rs (look up the breaker for the dependency name)
//!     → circuit_breaker.rs (admission check under the breaker lock)
//!     → operation runs unlocked
//!     → circuit_breaker.rs (record success/failure under the breaker lock)
//! ```
//!
//! # Design Decisions
//! - Breaker state is local to the process; nothing is persisted
//! - Breakers are independent; no lock ordering between them
//! - Original operation errors are always returned to the caller

pub mod circuit_breaker;
pub mod registry;

pub use circuit_breaker::{
    BreakerSettings, BreakerSnapshot, CircuitBreaker, CircuitState, ForcedState,
};
pub use registry::BreakerRegistry;

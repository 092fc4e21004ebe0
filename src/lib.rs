//! Resilience primitives for calls to unreliable dependencies.
//!
//! - [`resilience`]: per-dependency circuit breakers and their registry
//! - [`security`] + [`storage`]: fixed-window rate limiting over a local or
//!   shared (Redis) counter store
//!
//! The remaining modules are the service glue around them: configuration,
//! the HTTP surface, the admin API, observability and lifecycle.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod storage;

pub use config::ServiceConfig;
pub use error::{
    CallError, CircuitOpenError, ConfigurationError, Error, LimitError, RateLimitExceeded,
    StorageUnavailable,
};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{BreakerRegistry, CircuitBreaker, CircuitState, ForcedState};
pub use security::RateLimiter;
pub use storage::{MemoryStorage, RedisStorage, Storage, StorageBackend};

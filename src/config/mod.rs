//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), or defaults
//!     → loader.rs (parse & deserialize, overlay environment variables)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → breaker defaults handed to the registry, limiter settings to the limiter
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; breakers capture their settings at creation
//! - All fields have defaults to allow minimal configs
//! - Environment variables keep the names operators already use
//!   (`CIRCUIT_BREAKER_FAIL_MAX_COUNT`, `RATE_LIMIT_REQUESTS_COUNT`, ...)
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, ObservabilityConfig, RateLimitConfig, ServerConfig,
    ServiceConfig, StorageKind,
};

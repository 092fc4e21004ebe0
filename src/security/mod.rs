//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-IP fixed-window admission check)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Rejections return 429 with a JSON body
//! - Store outages follow the configured fail-open/fail-closed policy;
//!   the limiter itself never guesses

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiter};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers and limiters produce:
//!     → logging.rs (structured log events, severity by significance)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Opening a circuit is logged at error, trials and recovery at info
//! - Admin overrides are logged at warn
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

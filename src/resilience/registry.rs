//! Process-wide registry of named circuit breakers.
//!
//! # Responsibilities
//! - Hand out one shared breaker per dependency name
//! - Create breakers lazily with the configured defaults
//! - Expose the administrative override path
//!
//! # Design Decisions
//! - Explicit object passed by `Arc` to call sites, not a global
//! - Get-or-insert goes through `DashMap::entry`, which holds the shard
//!   lock across the check and the insert, so concurrent first lookups of a
//!   name all end up with the same instance
//! - Append-only: breakers live as long as the registry

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::BreakerConfig;
use crate::error::ConfigurationError;
use crate::resilience::circuit_breaker::{
    BreakerSettings, BreakerSnapshot, CircuitBreaker, CircuitState, ForcedState,
};

/// Name-keyed cache of long-lived breakers.
#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    settings: BreakerSettings,
    prefix: String,
}

impl BreakerRegistry {
    /// Create an empty registry; fails fast on invalid defaults.
    pub fn new(config: &BreakerConfig) -> Result<Self, ConfigurationError> {
        let settings = BreakerSettings::try_from(config)?;
        Ok(Self::with_settings(config.name_prefix.clone(), settings))
    }

    pub fn with_settings(prefix: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            breakers: DashMap::new(),
            settings,
            prefix: prefix.into(),
        }
    }

    /// The breaker for `name`, created on first lookup.
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return Arc::clone(existing.value());
        }

        let entry = self.breakers.entry(name.to_string()).or_insert_with(|| {
            let full_name = self.full_name(name);
            tracing::debug!(
                breaker = %full_name,
                fail_threshold = self.settings.fail_threshold,
                reset_timeout = ?self.settings.reset_timeout,
                "Circuit breaker created"
            );
            Arc::new(CircuitBreaker::new(full_name, self.settings))
        });
        Arc::clone(entry.value())
    }

    /// The breaker for `name`, only if it already exists.
    pub fn find(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|b| Arc::clone(b.value()))
    }

    /// Current state of `name`, creating the breaker if needed.
    pub fn state_of(&self, name: &str) -> CircuitState {
        self.get(name).current_state()
    }

    /// Force `name` into `target`, creating the breaker if needed.
    /// Returns the breaker as it stands after the override.
    pub fn force_state(&self, name: &str, target: ForcedState) -> BreakerSnapshot {
        let breaker = self.get(name);
        breaker.force(target);
        breaker.snapshot()
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|b| Arc::clone(b.value())).collect();
        let mut snapshots: Vec<_> = breakers.iter().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    fn full_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}:{}", self.prefix, name)
        }
    }
}

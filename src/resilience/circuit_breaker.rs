//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a trial call is testing whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= fail_threshold
//! Open → Half-Open: on the first call attempted after reset_timeout
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails
//! any → Closed: a call succeeds
//! ```
//!
//! # Design Decisions
//! - Open → Half-Open is evaluated lazily when a call is attempted; no timer task
//! - Every error counts as a failure; error kinds are not distinguished
//! - The wrapped operation runs outside the lock; only the admission check
//!   and the outcome bookkeeping are serialized
//! - A call that is dropped before it settles (cancelled, panicked) is a failure

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::error::{CallError, CircuitOpenError, ConfigurationError};
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of an administrative override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedState {
    Open,
    Closed,
}

/// Immutable breaker parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub fail_threshold: u32,
    pub reset_timeout: Duration,
}

impl BreakerSettings {
    /// Validated settings; a zero threshold or timeout is rejected.
    pub fn new(fail_threshold: u32, reset_timeout: Duration) -> Result<Self, ConfigurationError> {
        if fail_threshold == 0 {
            return Err(ConfigurationError::new("fail_threshold", "must be positive"));
        }
        if reset_timeout.is_zero() {
            return Err(ConfigurationError::new("reset_timeout", "must be positive"));
        }
        Ok(Self {
            fail_threshold,
            reset_timeout,
        })
    }
}

impl TryFrom<&BreakerConfig> for BreakerSettings {
    type Error = ConfigurationError;

    fn try_from(config: &BreakerConfig) -> Result<Self, Self::Error> {
        Self::new(config.fail_threshold, config.reset_timeout())
    }
}

/// Point-in-time view of a breaker, for admin endpoints and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub fail_count: u32,
    pub fail_threshold: u32,
    pub reset_timeout_secs: f64,
    /// Seconds since the circuit last opened, while it is open.
    pub open_for_secs: Option<f64>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    fail_count: u32,
    opened_at: Option<Instant>,
}

/// A named circuit breaker guarding one dependency.
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<BreakerInner>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("state", &self.current_state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                fail_count: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    /// Current state. Does not evaluate the reset timeout.
    pub fn current_state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures recorded since the circuit last closed.
    pub fn fail_count(&self) -> u32 {
        self.lock().fail_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let open_for_secs = match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) => Some(at.elapsed().as_secs_f64()),
            _ => None,
        };
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            fail_count: inner.fail_count,
            fail_threshold: self.settings.fail_threshold,
            reset_timeout_secs: self.settings.reset_timeout.as_secs_f64(),
            open_for_secs,
        }
    }

    /// Run `operation` under breaker protection.
    ///
    /// Returns the operation's value on success and its own error wrapped in
    /// [`CallError::Failed`] on failure. When the circuit is open and the reset
    /// timeout has not elapsed, fails with [`CallError::Open`] without
    /// invoking `operation`.
    pub async fn guard<F, Fut, T, E>(&self, operation: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire()?;

        let pending = PendingCall::new(self);
        match operation().await {
            Ok(value) => {
                pending.succeeded();
                Ok(value)
            }
            Err(err) => {
                pending.failed();
                Err(CallError::Failed(err))
            }
        }
    }

    /// Like [`guard`](Self::guard), but the operation must finish within `timeout`.
    /// An elapsed deadline counts as a failure.
    pub async fn guard_with_timeout<F, Fut, T, E>(
        &self,
        timeout: Duration,
        operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire()?;

        let pending = PendingCall::new(self);
        match tokio::time::timeout(timeout, operation()).await {
            Ok(Ok(value)) => {
                pending.succeeded();
                Ok(value)
            }
            Ok(Err(err)) => {
                pending.failed();
                Err(CallError::Failed(err))
            }
            Err(_) => {
                pending.timed_out(timeout);
                Err(CallError::Timeout(timeout))
            }
        }
    }

    /// Administrative override, bypassing the failure-evidence path.
    pub fn force(&self, target: ForcedState) {
        let mut inner = self.lock();
        let from = inner.state;
        let to = match target {
            ForcedState::Open => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                CircuitState::Open
            }
            ForcedState::Closed => {
                inner.state = CircuitState::Closed;
                inner.fail_count = 0;
                inner.opened_at = None;
                CircuitState::Closed
            }
        };
        drop(inner);

        tracing::warn!(breaker = %self.name, from = %from, to = %to, "Circuit state forced");
        metrics::record_transition(&self.name, to);
    }

    // --- State bookkeeping, each step under the breaker lock ---

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock still holds valid data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_acquire(&self) -> Result<(), CircuitOpenError> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let ready = inner
            .opened_at
            .map_or(true, |at| at.elapsed() >= self.settings.reset_timeout);
        if !ready {
            drop(inner);
            metrics::record_call(&self.name, "rejected");
            return Err(CircuitOpenError {
                name: self.name.clone(),
                state: CircuitState::Open,
            });
        }

        inner.state = CircuitState::HalfOpen;
        drop(inner);

        tracing::info!(breaker = %self.name, "Circuit OPEN → HALF_OPEN, admitting trial call");
        metrics::record_transition(&self.name, CircuitState::HalfOpen);
        Ok(())
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        let from = inner.state;
        inner.state = CircuitState::Closed;
        inner.fail_count = 0;
        inner.opened_at = None;
        drop(inner);

        if from != CircuitState::Closed {
            tracing::info!(breaker = %self.name, from = %from, "Circuit → CLOSED");
            metrics::record_transition(&self.name, CircuitState::Closed);
        }
    }

    fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            // Already open: a straggler that was admitted before the circuit
            // opened. The open window is not extended.
            CircuitState::Open => {}
            CircuitState::Closed | CircuitState::HalfOpen => {
                let from = inner.state;
                inner.fail_count = inner.fail_count.saturating_add(1);
                let failures = inner.fail_count;

                if from == CircuitState::HalfOpen || failures >= self.settings.fail_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    drop(inner);

                    tracing::error!(
                        breaker = %self.name,
                        from = %from,
                        failures,
                        "Circuit → OPEN"
                    );
                    metrics::record_transition(&self.name, CircuitState::Open);
                }
            }
        }
    }
}

/// Settles the outcome of one admitted call. Dropping it unsettled records a failure.
struct PendingCall<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl<'a> PendingCall<'a> {
    fn new(breaker: &'a CircuitBreaker) -> Self {
        Self {
            breaker,
            settled: false,
        }
    }

    fn succeeded(mut self) {
        self.settled = true;
        self.breaker.record_success();
        metrics::record_call(&self.breaker.name, "success");
    }

    fn failed(mut self) {
        self.settled = true;
        self.breaker.record_failure();
        metrics::record_call(&self.breaker.name, "failure");
    }

    fn timed_out(mut self, timeout: Duration) {
        self.settled = true;
        tracing::warn!(breaker = %self.breaker.name, ?timeout, "Guarded call timed out");
        self.breaker.record_failure();
        metrics::record_call(&self.breaker.name, "timeout");
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(breaker = %self.breaker.name, "Guarded call cancelled before completion");
            self.breaker.record_failure();
            metrics::record_call(&self.breaker.name, "cancelled");
        }
    }
}

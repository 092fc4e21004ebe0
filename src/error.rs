//! Error types surfaced to callers.
//!
//! Each failure mode has its own type so callers can match on exactly the
//! outcome they care about. [`Error`] collects them for the server binary.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::resilience::circuit_breaker::CircuitState;

/// A guarded call was rejected without invoking the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit '{name}' is {state}, call rejected")]
pub struct CircuitOpenError {
    /// Full (prefixed) breaker name.
    pub name: String,
    /// State observed when the call was rejected.
    pub state: CircuitState,
}

/// Outcome of a call made through a circuit breaker that did not succeed.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// The breaker short-circuited; the operation was never invoked.
    #[error(transparent)]
    Open(#[from] CircuitOpenError),

    /// The operation did not finish before its deadline.
    #[error("guarded operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation ran and failed with its own error.
    #[error("{0}")]
    Failed(E),
}

impl<E> CallError<E> {
    /// True when the call was short-circuited.
    pub fn is_open(&self) -> bool {
        matches!(self, CallError::Open(_))
    }

    /// The operation's own error, if it ran and failed.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CallError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// An admission check denied the key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rate limit exceeded for '{key}'")]
pub struct RateLimitExceeded {
    pub key: String,
}

/// The counter store could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage backend unavailable: {cause}")]
pub struct StorageUnavailable {
    pub cause: String,
}

impl From<redis::RedisError> for StorageUnavailable {
    fn from(err: redis::RedisError) -> Self {
        Self {
            cause: err.to_string(),
        }
    }
}

/// Outcome of a denied or failed admission check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitError {
    #[error(transparent)]
    Exceeded(#[from] RateLimitExceeded),

    #[error(transparent)]
    Unavailable(#[from] StorageUnavailable),
}

/// A breaker or limiter was constructed with invalid parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ConfigurationError {
    pub field: String,
    pub reason: String,
}

impl ConfigurationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Joins a list of validation errors for display.
pub(crate) struct ErrorList<'a>(pub &'a [ConfigurationError]);

impl fmt::Display for ErrorList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

/// Process-level failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Storage(#[from] StorageUnavailable),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let open = CircuitOpenError {
            name: "cb:email".into(),
            state: CircuitState::Open,
        };
        assert_eq!(open.to_string(), "circuit 'cb:email' is OPEN, call rejected");

        let cfg = ConfigurationError::new("window_secs", "must be positive");
        assert_eq!(cfg.to_string(), "invalid window_secs: must be positive");

        let limited = LimitError::from(RateLimitExceeded { key: "1.2.3.4".into() });
        assert_eq!(limited.to_string(), "rate limit exceeded for '1.2.3.4'");
    }

    #[test]
    fn test_call_error_accessors() {
        let failed: CallError<&str> = CallError::Failed("boom");
        assert!(!failed.is_open());
        assert_eq!(failed.to_string(), "boom");
        assert_eq!(failed.into_inner(), Some("boom"));

        let open: CallError<&str> = CircuitOpenError {
            name: "cb:x".into(),
            state: CircuitState::Open,
        }
        .into();
        assert!(open.is_open());
        assert_eq!(open.into_inner(), None);
    }

    #[test]
    fn test_error_list_joins() {
        let errors = vec![
            ConfigurationError::new("a", "x"),
            ConfigurationError::new("b", "y"),
        ];
        assert_eq!(ErrorList(&errors).to_string(), "invalid a: x, invalid b: y");
    }
}

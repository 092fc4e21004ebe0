//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::validate_config;
use crate::error::{ConfigurationError, ErrorList};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", ErrorList(.0))]
    Validation(Vec<ConfigurationError>),
}

/// Load a TOML file, apply environment overrides and validate.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServiceConfig = toml::from_str(&content)?;
    finish(config)
}

/// Start from defaults, apply environment overrides and validate.
pub fn load_from_env() -> Result<ServiceConfig, ConfigError> {
    finish(ServiceConfig::default())
}

fn finish(mut config: ServiceConfig) -> Result<ServiceConfig, ConfigError> {
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` resolves a variable name to its value; empty values count as unset.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("BIND_ADDRESS") {
        config.server.bind_address = v;
    }
    if let Some(v) = get("CIRCUIT_BREAKER_FAIL_MAX_COUNT") {
        config.circuit_breaker.fail_threshold = parse("CIRCUIT_BREAKER_FAIL_MAX_COUNT", &v)?;
    }
    if let Some(v) = get("CIRCUIT_BREAKER_RESET_TIMEOUT") {
        config.circuit_breaker.reset_timeout_secs = parse("CIRCUIT_BREAKER_RESET_TIMEOUT", &v)?;
    }
    if let Some(v) = get("CIRCUIT_BREAKER_PREFIX_NAME") {
        config.circuit_breaker.name_prefix = v;
    }
    if let Some(v) = get("RATE_LIMIT_REQUESTS_COUNT") {
        config.rate_limit.capacity = parse("RATE_LIMIT_REQUESTS_COUNT", &v)?;
    }
    if let Some(v) = get("RATE_LIMIT_REQUESTS_TIME_IN_SECONDS") {
        config.rate_limit.window_secs = parse("RATE_LIMIT_REQUESTS_TIME_IN_SECONDS", &v)?;
    }
    if let Some(v) = get("RATE_LIMIT_REQUESTS_STORAGE_TYPE") {
        config.rate_limit.storage = v.parse().map_err(|reason| ConfigError::Env {
            var: "RATE_LIMIT_REQUESTS_STORAGE_TYPE",
            reason,
        })?;
    }
    if let Some(v) = get("REDIS_URL") {
        config.rate_limit.redis_url = Some(v);
    }
    if let Some(v) = get("ADMIN_API_KEY") {
        config.admin.api_key = v;
    }

    Ok(())
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var,
        reason: format!("'{}' is not valid: {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StorageKind;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("CIRCUIT_BREAKER_FAIL_MAX_COUNT", "3"),
                ("CIRCUIT_BREAKER_RESET_TIMEOUT", "10"),
                ("CIRCUIT_BREAKER_PREFIX_NAME", "svc"),
                ("RATE_LIMIT_REQUESTS_COUNT", "100"),
                ("RATE_LIMIT_REQUESTS_STORAGE_TYPE", "redis"),
                ("REDIS_URL", "redis://cache:6379/"),
            ]),
        )
        .unwrap();

        assert_eq!(config.circuit_breaker.fail_threshold, 3);
        assert_eq!(config.circuit_breaker.reset_timeout_secs, 10);
        assert_eq!(config.circuit_breaker.name_prefix, "svc");
        assert_eq!(config.rate_limit.capacity, 100);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.storage, StorageKind::Redis);
        assert_eq!(config.rate_limit.redis_url.as_deref(), Some("redis://cache:6379/"));
    }

    #[test]
    fn test_empty_env_value_is_unset() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, env(&[("RATE_LIMIT_REQUESTS_COUNT", "")])).unwrap();
        assert_eq!(config.rate_limit.capacity, 40);
    }

    #[test]
    fn test_malformed_env_value() {
        let mut config = ServiceConfig::default();
        let err = apply_env_overrides(
            &mut config,
            env(&[("RATE_LIMIT_REQUESTS_TIME_IN_SECONDS", "sixty")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Env { var: "RATE_LIMIT_REQUESTS_TIME_IN_SECONDS", .. }
        ));
    }

    #[test]
    fn test_load_config_file() {
        let path = std::env::temp_dir().join(format!("breakwater-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[circuit_breaker]\nfail_threshold = 0\n\n[rate_limit]\nwindow_secs = 0\n",
        )
        .unwrap();

        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).unwrap_or_default();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

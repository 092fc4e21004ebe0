//! Counter storage subsystem.
//!
//! # Data Flow
//! ```text
//! RateLimiter::allow(key)
//!     → Storage::increment(key, weight, ttl)
//!         memory.rs: lock map → reset if expired → add → unlock
//!         redis_storage.rs: one Lua script (INCRBYFLOAT + EXPIRE if new)
//!     → (new count, fresh window?)
//! ```
//!
//! # Design Decisions
//! - One primitive: "add N, expire after T", atomic per key
//! - Backends own bucket state; the limiter holds only capacity and window
//! - Backend is chosen from configuration at startup (enum dispatch)

pub mod memory;
pub mod redis_storage;
pub mod sweeper;

use std::future::Future;
use std::time::Duration;

use crate::config::{RateLimitConfig, StorageKind};
use crate::error::{ConfigurationError, Error, StorageUnavailable};

pub use self::memory::MemoryStorage;
pub use self::redis_storage::RedisStorage;
pub use self::sweeper::BucketSweeper;

/// Result of one increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Increment {
    /// Count after the increment.
    pub count: f64,
    /// True when this increment opened a new window.
    pub fresh_window: bool,
}

/// A counter store with an atomic "add `weight`, expire after `ttl`" primitive.
pub trait Storage: Send + Sync {
    fn increment(
        &self,
        key: &str,
        weight: f64,
        ttl: Duration,
    ) -> impl Future<Output = Result<Increment, StorageUnavailable>> + Send;
}

/// The configured backend.
#[derive(Debug)]
pub enum StorageBackend {
    Memory(MemoryStorage),
    Redis(RedisStorage),
}

impl StorageBackend {
    /// Build the backend named by `config`, connecting to Redis if selected.
    pub async fn from_config(config: &RateLimitConfig) -> Result<Self, Error> {
        match config.storage {
            StorageKind::Memory => Ok(StorageBackend::Memory(MemoryStorage::new())),
            StorageKind::Redis => {
                let url = config
                    .redis_url
                    .as_deref()
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| {
                        ConfigurationError::new("rate_limit.redis_url", "required when storage is redis")
                    })?;
                let storage = RedisStorage::connect(url, config.key_prefix.clone()).await?;
                tracing::info!(key_prefix = %config.key_prefix, "Connected to shared rate-limit store");
                Ok(StorageBackend::Redis(storage))
            }
        }
    }

    /// The in-memory store, if that is the active backend.
    pub fn as_memory(&self) -> Option<&MemoryStorage> {
        match self {
            StorageBackend::Memory(storage) => Some(storage),
            StorageBackend::Redis(_) => None,
        }
    }
}

impl Storage for StorageBackend {
    async fn increment(
        &self,
        key: &str,
        weight: f64,
        ttl: Duration,
    ) -> Result<Increment, StorageUnavailable> {
        match self {
            StorageBackend::Memory(storage) => storage.increment(key, weight, ttl).await,
            StorageBackend::Redis(storage) => storage.increment(key, weight, ttl).await,
        }
    }
}

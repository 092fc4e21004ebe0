//! Redis-backed counter store.
//!
//! Lets several processes share one fixed-window counter per key.
//!
//! ## Atomicity
//!
//! The increment and the conditional expiry run as one Lua script on the
//! server. `EXPIRE` is applied only when the key has no TTL yet, which is
//! exactly the case where this increment created it. Running the two steps
//! separately could leave an incremented key that never expires.
//!
//! ## Error Handling
//!
//! Connection and command failures surface as [`StorageUnavailable`]. Nothing
//! is retried here; the caller owns the retry and fail-open/closed policy.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{Client, Script};

use crate::error::StorageUnavailable;
use crate::storage::{Increment, Storage};

/// KEYS[1] = counter key, ARGV[1] = weight, ARGV[2] = ttl seconds.
/// Returns { new count as string, 1 if a fresh window was opened else 0 }.
const INCREMENT_SCRIPT: &str = r"
local current = redis.call('INCRBYFLOAT', KEYS[1], ARGV[1])
local fresh = 0
if redis.call('TTL', KEYS[1]) == -1 then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
    fresh = 1
end
return { current, fresh }
";

/// Shared counter store.
#[derive(Clone)]
pub struct RedisStorage {
    connection: ConnectionManager,
    script: Arc<Script>,
    key_prefix: String,
}

impl fmt::Debug for RedisStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStorage")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisStorage {
    /// Connect to Redis.
    ///
    /// # Errors
    /// Returns [`StorageUnavailable`] if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, StorageUnavailable> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            connection,
            script: Arc::new(Script::new(INCREMENT_SCRIPT)),
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }
}

impl Storage for RedisStorage {
    async fn increment(
        &self,
        key: &str,
        weight: f64,
        ttl: Duration,
    ) -> Result<Increment, StorageUnavailable> {
        // ConnectionManager clones share one multiplexed connection.
        let mut connection = self.connection.clone();
        let (count, fresh): (f64, i64) = self
            .script
            .key(self.key(key))
            .arg(weight)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut connection)
            .await?;

        Ok(Increment {
            count,
            fresh_window: fresh == 1,
        })
    }
}

/// Whole seconds for `EXPIRE`, rounded up, at least one.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

//! Process-local counter store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::StorageUnavailable;
use crate::storage::{Increment, Storage};

/// Roughly thirty years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: f64,
    expires_at: Instant,
}

/// Fixed-window buckets in a mutex-guarded map.
///
/// No cross-process visibility. Expired buckets are reset on the next
/// increment and dropped by [`purge_expired`](Self::purge_expired).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an increment synchronously.
    pub fn increment_now(&self, key: &str, weight: f64, ttl: Duration) -> Increment {
        let now = Instant::now();
        let mut buckets = self.lock();

        if let Some(bucket) = buckets.get_mut(key) {
            if now <= bucket.expires_at {
                bucket.count += weight;
                return Increment {
                    count: bucket.count,
                    fresh_window: false,
                };
            }
        }

        // Missing or expired: the reset and the new window happen together.
        buckets.insert(
            key.to_string(),
            Bucket {
                count: weight,
                expires_at: window_end(now, ttl),
            },
        );
        Increment {
            count: weight,
            fresh_window: true,
        }
    }

    /// Drop every bucket whose window has ended. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| now <= bucket.expires_at);
        before - buckets.len()
    }

    /// Number of tracked keys, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// End of a window opened at `now`, saturating at a far-future instant for
/// windows too long to represent.
fn window_end(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

impl Storage for MemoryStorage {
    async fn increment(
        &self,
        key: &str,
        weight: f64,
        ttl: Duration,
    ) -> Result<Increment, StorageUnavailable> {
        Ok(self.increment_now(key, weight, ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_counts_within_window() {
        let store = MemoryStorage::new();
        let first = store.increment("k", 1.0, WINDOW).await.unwrap();
        assert_eq!(first, Increment { count: 1.0, fresh_window: true });

        let second = store.increment("k", 1.0, WINDOW).await.unwrap();
        assert_eq!(second, Increment { count: 2.0, fresh_window: false });

        let other = store.increment("other", 2.5, WINDOW).await.unwrap();
        assert_eq!(other.count, 2.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resets_after_expiry() {
        let store = MemoryStorage::new();
        for _ in 0..5 {
            store.increment("k", 1.0, WINDOW).await.unwrap();
        }

        // Exactly at the boundary the window is still current.
        tokio::time::advance(WINDOW).await;
        assert_eq!(store.increment("k", 1.0, WINDOW).await.unwrap().count, 6.0);

        tokio::time::advance(Duration::from_millis(1)).await;
        let reset = store.increment("k", 1.0, WINDOW).await.unwrap();
        assert_eq!(reset, Increment { count: 1.0, fresh_window: true });
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryStorage::new();
        store.increment("old", 1.0, Duration::from_secs(10)).await.unwrap();
        store.increment("new", 1.0, Duration::from_secs(100)).await.unwrap();
        assert_eq!(store.len(), 2);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.increment("new", 1.0, WINDOW).await.unwrap().count, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_window_does_not_overflow() {
        let store = MemoryStorage::new();
        let window = Duration::from_secs(u64::MAX);

        let first = store.increment("k", 1.0, window).await.unwrap();
        assert_eq!(first, Increment { count: 1.0, fresh_window: true });

        tokio::time::advance(Duration::from_secs(86_400)).await;
        let second = store.increment("k", 1.0, window).await.unwrap();
        assert_eq!(second, Increment { count: 2.0, fresh_window: false });
        assert_eq!(store.purge_expired(), 0);
    }
}

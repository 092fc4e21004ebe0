//! Periodic cleanup of expired in-memory buckets.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::security::RateLimiter;
use crate::storage::StorageBackend;

pub struct BucketSweeper {
    limiter: Arc<RateLimiter<StorageBackend>>,
    interval: Duration,
}

impl BucketSweeper {
    pub fn new(limiter: Arc<RateLimiter<StorageBackend>>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let Some(storage) = self.limiter.storage().as_memory() else {
            tracing::debug!("Shared rate-limit store expires keys itself, sweeper not needed");
            return;
        };

        tracing::info!(interval = ?self.interval, "Bucket sweeper starting");
        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = storage.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = storage.len(), "Purged expired buckets");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Bucket sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

//! Shared-store tests against a live Redis.
//!
//! Run with `REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored`.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use breakwater::storage::Storage;
use breakwater::{RateLimiter, RedisStorage};

async fn connect() -> RedisStorage {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    RedisStorage::connect(&url, "breakwater-test").await.unwrap()
}

/// A key no previous run has used.
fn unique_key(label: &str) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    format!("{label}-{}-{nanos}", std::process::id())
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_increment_marks_fresh_window_once() {
    let storage = connect().await;
    let key = unique_key("fresh");

    let first = storage.increment(&key, 1.0, Duration::from_secs(30)).await.unwrap();
    assert_eq!(first.count, 1.0);
    assert!(first.fresh_window);

    let second = storage.increment(&key, 2.5, Duration::from_secs(30)).await.unwrap();
    assert_eq!(second.count, 3.5);
    assert!(!second.fresh_window);
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_window_expires() {
    let storage = connect().await;
    let key = unique_key("expiry");

    storage.increment(&key, 1.0, Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let after = storage.increment(&key, 1.0, Duration::from_secs(1)).await.unwrap();
    assert_eq!(after.count, 1.0);
    assert!(after.fresh_window);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires a running Redis"]
async fn test_limiter_shared_across_instances() {
    let key = unique_key("shared");
    // Two limiters with separate connections model two processes.
    let a = Arc::new(RateLimiter::new(10, Duration::from_secs(60), connect().await).unwrap());
    let b = Arc::new(RateLimiter::new(10, Duration::from_secs(60), connect().await).unwrap());

    let handles: Vec<_> = (0..30)
        .map(|i| {
            let limiter = if i % 2 == 0 { Arc::clone(&a) } else { Arc::clone(&b) };
            let key = key.clone();
            tokio::spawn(async move { limiter.allow(&key).await.unwrap() })
        })
        .collect();

    let admitted = futures_util::future::join_all(handles)
        .await
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count();
    assert_eq!(admitted, 10);
}

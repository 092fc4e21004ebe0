//! Circuit breaker scenarios through the registry.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use breakwater::config::BreakerConfig;
use breakwater::{BreakerRegistry, CallError, CircuitState};

#[derive(Debug, PartialEq)]
struct Upstream(&'static str);

fn registry(fail_threshold: u32, reset_timeout_secs: u64) -> BreakerRegistry {
    BreakerRegistry::new(&BreakerConfig {
        fail_threshold,
        reset_timeout_secs,
        name_prefix: "cb".into(),
    })
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_open_then_trial_failure_then_recovery() {
    let reg = registry(3, 30);
    let breaker = reg.get("payments");
    let invocations = Arc::new(AtomicU32::new(0));

    let failing = || {
        let invocations = Arc::clone(&invocations);
        async move {
            invocations.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Upstream("timeout"))
        }
    };

    // Three failing calls open the circuit; the original error comes back each time.
    for _ in 0..3 {
        match breaker.guard(failing).await {
            Err(CallError::Failed(err)) => assert_eq!(err, Upstream("timeout")),
            other => panic!("expected upstream failure, got {other:?}"),
        }
    }
    assert_eq!(breaker.current_state(), CircuitState::Open);
    assert_eq!(invocations.load(Ordering::SeqCst), 3);

    // t+10s: rejected without invoking the operation.
    tokio::time::advance(Duration::from_secs(10)).await;
    let err = breaker.guard(failing).await.unwrap_err();
    assert!(err.is_open());
    assert_eq!(invocations.load(Ordering::SeqCst), 3);

    // t+31s: one trial admitted; it fails and the circuit re-opens from now.
    tokio::time::advance(Duration::from_secs(21)).await;
    assert!(matches!(breaker.guard(failing).await, Err(CallError::Failed(_))));
    assert_eq!(invocations.load(Ordering::SeqCst), 4);
    assert_eq!(breaker.current_state(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(29)).await;
    assert!(breaker.guard(failing).await.unwrap_err().is_open());

    // Another 30s after the failed trial: the next trial succeeds and closes.
    tokio::time::advance(Duration::from_secs(1)).await;
    let value = breaker
        .guard(|| async { Ok::<_, Upstream>("recovered") })
        .await
        .unwrap();
    assert_eq!(value, "recovered");
    assert_eq!(breaker.current_state(), CircuitState::Closed);
    assert_eq!(breaker.fail_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_long_call_does_not_block_admission() {
    let reg = Arc::new(registry(3, 30));
    let slow_breaker = reg.get("search");

    let slow = tokio::spawn(async move {
        slow_breaker
            .guard(|| async {
                tokio::time::sleep(Duration::from_secs(20)).await;
                Ok::<_, Upstream>(1)
            })
            .await
    });
    tokio::task::yield_now().await;

    // While the slow call is in flight, other callers are admitted immediately.
    let quick = reg
        .get("search")
        .guard(|| async { Ok::<_, Upstream>(2) })
        .await
        .unwrap();
    assert_eq!(quick, 2);

    assert_eq!(slow.await.unwrap().unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_lookup_yields_one_instance() {
    let reg = Arc::new(registry(1000, 30));

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let reg = Arc::clone(&reg);
            tokio::spawn(async move {
                let breaker = reg.get("x");
                let _ = breaker.guard(|| async { Err::<(), _>(Upstream("down")) }).await;
                breaker
            })
        })
        .collect();

    let breakers: Vec<_> = futures_util::future::join_all(handles)
        .await
        .into_iter()
        .map(|h| h.unwrap())
        .collect();

    assert_eq!(reg.len(), 1);
    for breaker in &breakers {
        assert!(Arc::ptr_eq(breaker, &breakers[0]));
    }
    // Every failure recorded through any handle is visible through the registry.
    assert_eq!(reg.get("x").fail_count(), 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_open_once_at_threshold() {
    let reg = Arc::new(registry(10, 30));

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let breaker = reg.get("flaky");
            tokio::spawn(async move {
                breaker.guard(|| async { Err::<(), _>(Upstream("down")) }).await
            })
        })
        .collect();

    let mut failed = 0;
    let mut rejected = 0;
    for handle in futures_util::future::join_all(handles).await {
        match handle.unwrap() {
            Err(CallError::Failed(_)) => failed += 1,
            Err(CallError::Open(_)) => rejected += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(failed + rejected, 50);
    assert!(failed >= 10);
    let breaker = reg.get("flaky");
    assert_eq!(breaker.current_state(), CircuitState::Open);
    // Counting stops at the opening failure; stragglers that settle while
    // open neither count nor re-open.
    assert_eq!(breaker.fail_count(), 10);
}

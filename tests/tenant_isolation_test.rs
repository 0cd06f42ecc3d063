// ABOUTME: Integration tests for request-scoped tenant identity isolation
// ABOUTME: Concurrent calls must never observe each other's identity, even after panics
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use mealie_mcp_server::tenant::{current_identity, run_with_identity, TenantIdentity};

async fn observed_identity_after_work() -> Option<TenantIdentity> {
    // Interleave with other tasks a few times before reading the binding
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    current_identity()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_keep_their_own_identity() {
    let mut handles = Vec::new();
    for i in 0..32 {
        handles.push(tokio::spawn(async move {
            let me = TenantIdentity::new(&format!("user-{i}")).unwrap();
            let seen = run_with_identity(me.clone(), observed_identity_after_work()).await;
            assert_eq!(seen, Some(me));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_identity_torn_down_after_panic() {
    let handle = tokio::spawn(run_with_identity(
        TenantIdentity::new("panicking-user").unwrap(),
        async {
            tokio::task::yield_now().await;
            panic!("handler blew up");
        },
    ));
    assert!(handle.await.is_err());

    // Later work on the same runtime starts with no binding; the panicked
    // request's identity did not leak into any reusable slot.
    let seen = tokio::spawn(async { current_identity() }).await.unwrap();
    assert!(seen.is_none());
}

#[tokio::test]
async fn test_cancelled_request_leaves_no_binding() {
    let handle = tokio::spawn(run_with_identity(
        TenantIdentity::new("cancelled-user").unwrap(),
        async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        },
    ));
    tokio::task::yield_now().await;
    handle.abort();
    assert!(handle.await.is_err());

    assert!(current_identity().is_none());
    let seen = tokio::spawn(async { current_identity() }).await.unwrap();
    assert!(seen.is_none());
}

#[tokio::test]
async fn test_sequential_requests_on_one_task_do_not_bleed() {
    let alice = TenantIdentity::new("alice").unwrap();
    let bob = TenantIdentity::new("bob").unwrap();

    let seen_a = run_with_identity(alice.clone(), observed_identity_after_work()).await;
    assert_eq!(seen_a, Some(alice));

    // Between requests the task has no binding at all
    assert!(current_identity().is_none());

    let seen_b = run_with_identity(bob.clone(), observed_identity_after_work()).await;
    assert_eq!(seen_b, Some(bob));
}

// ABOUTME: Integration tests for the user token store lifecycle
// ABOUTME: Covers hot reload, revocation, failed reloads, and credential isolation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use mealie_mcp_server::errors::ErrorCode;
use mealie_mcp_server::tenant::TenantIdentity;
use mealie_mcp_server::tokens::UserTokenStore;

fn write_mapping(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("user_tokens.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[tokio::test]
async fn test_concurrent_tenants_resolve_their_own_tokens() {
    let dir = TempDir::new().unwrap();
    let path = write_mapping(
        &dir,
        r#"{"users": {"alice": "tok-alice", "bob": "tok-bob", "carol": "tok-carol"}}"#,
    );
    let store = std::sync::Arc::new(UserTokenStore::new(path, Duration::ZERO, None));

    let mut handles = Vec::new();
    for user in ["alice", "bob", "carol"] {
        let store = std::sync::Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                let token = store
                    .resolve(&TenantIdentity::new(user).unwrap())
                    .await
                    .unwrap();
                assert_eq!(token, format!("tok-{user}"));
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_unknown_user_rejected_even_with_default_token() {
    let dir = TempDir::new().unwrap();
    let path = write_mapping(&dir, r#"{"users": {"alice": "tok-alice"}}"#);
    let store = UserTokenStore::new(path, Duration::ZERO, Some("shared-default".into()));

    let err = store
        .resolve(&TenantIdentity::new("mallory").unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::TenantNotProvisioned);
    assert_eq!(err.http_status(), 403);
    assert!(!err.message.contains("shared-default"));
    assert!(!err.message.contains("tok-alice"));
}

#[tokio::test]
async fn test_operator_adds_user_without_restart() {
    let dir = TempDir::new().unwrap();
    let path = write_mapping(&dir, r#"{"users": {"alice": "tok-alice"}}"#);
    let store = UserTokenStore::new(path, Duration::ZERO, None);

    let dave = TenantIdentity::new("dave").unwrap();
    assert_eq!(
        store.resolve(&dave).await.unwrap_err().code,
        ErrorCode::TenantNotProvisioned
    );

    write_mapping(
        &dir,
        r#"{"users": {"alice": "tok-alice", "dave": "tok-dave"}}"#,
    );
    assert_eq!(store.resolve(&dave).await.unwrap(), "tok-dave");
}

#[tokio::test]
async fn test_removing_mapping_entry_revokes_access() {
    let dir = TempDir::new().unwrap();
    let path = write_mapping(&dir, r#"{"users": {"alice": "tok-alice"}}"#);
    let store = UserTokenStore::new(path, Duration::ZERO, None);

    let alice = TenantIdentity::new("alice").unwrap();
    assert_eq!(store.resolve(&alice).await.unwrap(), "tok-alice");

    write_mapping(&dir, r#"{"users": {}}"#);
    assert_eq!(
        store.resolve(&alice).await.unwrap_err().code,
        ErrorCode::TenantNotProvisioned
    );
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_mapping() {
    let dir = TempDir::new().unwrap();
    let path = write_mapping(&dir, r#"{"users": {"alice": "tok-alice"}}"#);
    let store = UserTokenStore::new(path, Duration::from_secs(3600), None);

    let alice = TenantIdentity::new("alice").unwrap();
    assert_eq!(store.resolve(&alice).await.unwrap(), "tok-alice");

    // Corrupt the file: the explicit reload fails, but the previously
    // loaded mapping still serves lookups within the TTL.
    write_mapping(&dir, "{not json");
    let err = store.reload().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    assert_eq!(store.resolve(&alice).await.unwrap(), "tok-alice");

    // Fixing the file brings reloads back.
    write_mapping(&dir, r#"{"users": {"alice": "tok-rotated"}}"#);
    store.reload().await.unwrap();
    assert_eq!(store.resolve(&alice).await.unwrap(), "tok-rotated");
}

#[tokio::test]
async fn test_malformed_mapping_surfaces_per_lookup_without_cache() {
    let dir = TempDir::new().unwrap();
    let path = write_mapping(&dir, "{not json");
    let store = UserTokenStore::new(path, Duration::ZERO, None);

    let err = store
        .resolve(&TenantIdentity::new("alice").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);

    // A sentinel caller with no default credential hits the same wall;
    // config errors are never masked as provisioning errors.
    let err = store.resolve(&TenantIdentity::sentinel()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
}

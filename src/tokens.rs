// ABOUTME: Per-user credential mapping store backed by a JSON file on disk
// ABOUTME: Hot-reloads so operators can add users without restarting the server
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! # User Token Store
//!
//! Maps verified OAuth subjects to Mealie API tokens. The source of truth is
//! a JSON document (`{"users": {"<subject>": "<token>"}}`) re-read whenever
//! the bounded TTL cache is stale, so a newly provisioned user is picked up
//! on the next lookup without a restart. The mapping is replaced whole on
//! each reload; a reload that drops a key revokes that user's access at the
//! next lookup. Token values are secrets and are only ever logged redacted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::tenant::TenantIdentity;

/// On-disk mapping document format
#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(default)]
    users: HashMap<String, String>,
}

#[derive(Debug)]
struct CachedMapping {
    loaded_at: Instant,
    users: HashMap<String, String>,
}

/// Credential store mapping tenant identities to Mealie API tokens
pub struct UserTokenStore {
    path: PathBuf,
    cache_ttl: Duration,
    /// Fallback credential for the sentinel tenant only; a real tenant
    /// missing from the mapping never falls through to it.
    default_credential: Option<String>,
    cache: RwLock<Option<CachedMapping>>,
}

impl UserTokenStore {
    /// Create a store reading from `path` with the given cache TTL.
    /// A TTL of zero reloads the mapping on every lookup.
    #[must_use]
    pub fn new(path: PathBuf, cache_ttl: Duration, default_credential: Option<String>) -> Self {
        Self {
            path,
            cache_ttl,
            default_credential,
            cache: RwLock::new(None),
        }
    }

    /// Resolve the Mealie API token for a tenant identity
    ///
    /// # Errors
    /// Returns a configuration error if the mapping file is malformed, or a
    /// tenant-not-provisioned error when the identity has no entry.
    pub async fn resolve(&self, identity: &TenantIdentity) -> AppResult<String> {
        let users = self.mapping().await?;

        if let Some(token) = users.get(identity.as_str()) {
            debug!(
                user = %identity,
                token = %redact(token),
                "resolved Mealie credential"
            );
            return Ok(token.clone());
        }

        if identity.is_sentinel() {
            if let Some(token) = &self.default_credential {
                debug!("sentinel tenant using default Mealie credential");
                return Ok(token.clone());
            }
        }

        warn!(
            user = %identity,
            "no Mealie token configured, add a mapping to {}",
            self.path.display()
        );
        Err(AppError::tenant_not_provisioned(format!(
            "no Mealie token configured for user '{identity}'; add an entry to {}",
            self.path.display()
        )))
    }

    /// Force a reload of the mapping, returning the number of entries
    ///
    /// # Errors
    /// Returns a configuration error if the mapping file is malformed.
    pub async fn reload(&self) -> AppResult<usize> {
        let users = Self::load_from_disk(&self.path).await?;
        let count = users.len();
        let mut cache = self.cache.write().await;
        *cache = Some(CachedMapping {
            loaded_at: Instant::now(),
            users,
        });
        info!("loaded Mealie tokens for {count} users");
        Ok(count)
    }

    /// Current mapping, reloading from disk when the cache is stale.
    /// A failed reload surfaces as an error for this lookup and leaves the
    /// previously loaded mapping untouched for later inspection.
    async fn mapping(&self) -> AppResult<HashMap<String, String>> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.loaded_at.elapsed() < self.cache_ttl {
                    return Ok(cached.users.clone());
                }
            }
        }

        match Self::load_from_disk(&self.path).await {
            Ok(users) => {
                let mut cache = self.cache.write().await;
                // Swap the mapping whole so readers never observe a partial write
                *cache = Some(CachedMapping {
                    loaded_at: Instant::now(),
                    users: users.clone(),
                });
                Ok(users)
            }
            Err(e) => {
                warn!("reloading {} failed: {e}", self.path.display());
                Err(e)
            }
        }
    }

    async fn load_from_disk(path: &Path) -> AppResult<HashMap<String, String>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "user tokens file not found: {}, treating as empty mapping",
                    path.display()
                );
                return Ok(HashMap::new());
            }
            Err(e) => {
                return Err(AppError::config_invalid(format!(
                    "cannot read user tokens file {}",
                    path.display()
                ))
                .with_source(e))
            }
        };

        let file: TokenFile = serde_json::from_str(&raw).map_err(|e| {
            AppError::config_invalid(format!(
                "invalid JSON in user tokens file {}: expected {{\"users\": {{\"<subject>\": \"<token>\"}}}}",
                path.display()
            ))
            .with_source(e)
        })?;

        Ok(file.users)
    }
}

/// Redact a credential for logging: a short prefix plus its length
#[must_use]
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…({} chars)", token.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_mapping(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("user_tokens.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn store(path: PathBuf) -> UserTokenStore {
        UserTokenStore::new(path, Duration::ZERO, None)
    }

    #[tokio::test]
    async fn test_resolve_known_user() {
        let dir = TempDir::new().unwrap();
        let path = write_mapping(&dir, r#"{"users": {"alice": "tokA"}}"#);

        let token = store(path)
            .resolve(&TenantIdentity::new("alice").unwrap())
            .await
            .unwrap();
        assert_eq!(token, "tokA");
    }

    #[tokio::test]
    async fn test_unknown_user_never_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = write_mapping(&dir, r#"{"users": {"alice": "tokA"}}"#);

        let store = UserTokenStore::new(path, Duration::ZERO, Some("default-tok".into()));
        let err = store
            .resolve(&TenantIdentity::new("bob").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::TenantNotProvisioned);
        // The error message points at the file, not at any credential value
        assert!(!err.message.contains("tokA"));
        assert!(!err.message.contains("default-tok"));
    }

    #[tokio::test]
    async fn test_sentinel_uses_default_credential_explicitly() {
        let dir = TempDir::new().unwrap();
        let path = write_mapping(&dir, r#"{"users": {}}"#);

        let store = UserTokenStore::new(path, Duration::ZERO, Some("default-tok".into()));
        let token = store.resolve(&TenantIdentity::sentinel()).await.unwrap();
        assert_eq!(token, "default-tok");
    }

    #[tokio::test]
    async fn test_mapping_entry_overrides_default_for_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = write_mapping(&dir, r#"{"users": {"default": "mapped-tok"}}"#);

        let store = UserTokenStore::new(path, Duration::ZERO, Some("env-tok".into()));
        let token = store.resolve(&TenantIdentity::sentinel()).await.unwrap();
        assert_eq!(token, "mapped-tok");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_mapping_not_fatal() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path().join("nope.json"));
        assert_eq!(store.reload().await.unwrap(), 0);

        let err = store
            .resolve(&TenantIdentity::new("alice").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::TenantNotProvisioned);
    }

    #[tokio::test]
    async fn test_malformed_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = write_mapping(&dir, r#"["not", "a", "mapping"]"#);

        let err = store(path).reload().await.unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::ConfigInvalid);
    }

    #[tokio::test]
    async fn test_hot_reload_picks_up_new_user() {
        let dir = TempDir::new().unwrap();
        let path = write_mapping(&dir, r#"{"users": {"alice": "tokA"}}"#);
        let store = store(path.clone());

        assert!(store
            .resolve(&TenantIdentity::new("carol").unwrap())
            .await
            .is_err());

        write_mapping(&dir, r#"{"users": {"alice": "tokA", "carol": "tokC"}}"#);
        let token = store
            .resolve(&TenantIdentity::new("carol").unwrap())
            .await
            .unwrap();
        assert_eq!(token, "tokC");
    }

    #[tokio::test]
    async fn test_reload_is_full_replacement_and_revokes() {
        let dir = TempDir::new().unwrap();
        let path = write_mapping(&dir, r#"{"users": {"alice": "tokA"}}"#);
        let store = store(path.clone());

        let alice = TenantIdentity::new("alice").unwrap();
        assert_eq!(store.resolve(&alice).await.unwrap(), "tokA");

        write_mapping(&dir, r#"{"users": {}}"#);
        let err = store.resolve(&alice).await.unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::TenantNotProvisioned);
    }

    #[tokio::test]
    async fn test_identical_reloads_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_mapping(&dir, r#"{"users": {"alice": "tokA"}}"#);
        let store = store(path);

        let alice = TenantIdentity::new("alice").unwrap();
        let first = store.resolve(&alice).await.unwrap();
        store.reload().await.unwrap();
        store.reload().await.unwrap();
        assert_eq!(store.resolve(&alice).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_ttl_bounds_staleness() {
        let dir = TempDir::new().unwrap();
        let path = write_mapping(&dir, r#"{"users": {"alice": "tokA"}}"#);
        let store = UserTokenStore::new(path.clone(), Duration::from_secs(3600), None);

        let alice = TenantIdentity::new("alice").unwrap();
        assert_eq!(store.resolve(&alice).await.unwrap(), "tokA");

        // Within the TTL the cached value is served even after a disk change
        write_mapping(&dir, r#"{"users": {"alice": "tokB"}}"#);
        assert_eq!(store.resolve(&alice).await.unwrap(), "tokA");

        // An explicit reload observes the new value immediately
        store.reload().await.unwrap();
        assert_eq!(store.resolve(&alice).await.unwrap(), "tokB");
    }

    #[test]
    fn test_redact_hides_token_body() {
        let redacted = redact("super-secret-mealie-token");
        assert!(redacted.starts_with("supe"));
        assert!(!redacted.contains("secret"));
    }
}

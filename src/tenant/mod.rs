// ABOUTME: Tenant identity and request-scoped context carrier
// ABOUTME: Task-local binding so concurrent calls never observe each other's identity
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! # Tenant Context
//!
//! One tenant is one end user owning exactly one Mealie account. The identity
//! of the current caller is bound to the serving task with `tokio::task_local!`
//! rather than any process-wide slot: every `.await` inside the scope resumes
//! with the same binding, concurrently executing calls each see only their
//! own, and the binding is dropped with the scope on every exit path,
//! including panic and cancellation. A reused worker task can therefore never
//! observe a previous call's identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::defaults;
use crate::errors::{AppError, AppResult};

/// Opaque identity of the calling tenant, derived from a verified OAuth
/// subject claim. Equality is exact string match; the value is trimmed at
/// construction and never otherwise normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantIdentity(String);

impl TenantIdentity {
    /// Create an identity from a verified subject claim
    ///
    /// # Errors
    /// Returns an authentication-malformed error if the subject is blank.
    pub fn new(subject: &str) -> AppResult<Self> {
        let trimmed = subject.trim();
        if trimmed.is_empty() {
            return Err(AppError::auth_malformed(
                "verified token carries an empty subject claim",
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The sentinel identity for single-tenant / unauthenticated deployments.
    /// Modeled as an explicit tenant so a missing mapping entry for a real
    /// user can never silently fall through to the default credential.
    #[must_use]
    pub fn sentinel() -> Self {
        Self(defaults::SENTINEL_TENANT.to_owned())
    }

    /// Borrow the identity value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this is the sentinel single-tenant identity
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.0 == defaults::SENTINEL_TENANT
    }
}

impl fmt::Display for TenantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

tokio::task_local! {
    static CURRENT_TENANT: TenantIdentity;
}

/// Run `work` with `identity` bound as the current tenant for the full
/// duration of the future, including nested async calls. The binding is
/// scoped to this task only; teardown is the scope drop itself.
pub async fn run_with_identity<F>(identity: TenantIdentity, work: F) -> F::Output
where
    F: std::future::Future,
{
    CURRENT_TENANT.scope(identity, work).await
}

/// The identity bound to the current task, or `None` outside any
/// request scope. Callers treat `None` as "unauthenticated", never a crash.
#[must_use]
pub fn current_identity() -> Option<TenantIdentity> {
    CURRENT_TENANT.try_with(Clone::clone).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_trims_and_rejects_blank() {
        let id = TenantIdentity::new("  alice  ").unwrap();
        assert_eq!(id.as_str(), "alice");
        assert!(TenantIdentity::new("   ").is_err());
        assert!(TenantIdentity::new("").is_err());
    }

    #[test]
    fn test_sentinel_is_explicit() {
        let sentinel = TenantIdentity::sentinel();
        assert!(sentinel.is_sentinel());
        assert!(!TenantIdentity::new("alice").unwrap().is_sentinel());
    }

    #[tokio::test]
    async fn test_identity_visible_through_call_depth() {
        async fn leaf() -> Option<TenantIdentity> {
            tokio::task::yield_now().await;
            current_identity()
        }

        let seen = run_with_identity(TenantIdentity::new("alice").unwrap(), leaf()).await;
        assert_eq!(seen.unwrap().as_str(), "alice");
    }

    #[tokio::test]
    async fn test_absent_outside_scope() {
        assert!(current_identity().is_none());
        run_with_identity(TenantIdentity::new("bob").unwrap(), async {}).await;
        assert!(current_identity().is_none());
    }

    #[tokio::test]
    async fn test_nested_scope_shadows_then_restores() {
        let outer = TenantIdentity::new("alice").unwrap();
        let inner = TenantIdentity::new("bob").unwrap();

        run_with_identity(outer.clone(), async {
            assert_eq!(current_identity(), Some(outer.clone()));
            run_with_identity(inner.clone(), async {
                assert_eq!(current_identity(), Some(inner.clone()));
            })
            .await;
            assert_eq!(current_identity(), Some(outer.clone()));
        })
        .await;
    }
}

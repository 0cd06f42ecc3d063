// ABOUTME: Claim verification seam and tenant identity resolution
// ABOUTME: Consumes the external authorization server's verdict; extracts, never verifies
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! # Authentication
//!
//! Token verification belongs to the external OAuth authorization server.
//! This module only consumes its verdict: [`ClaimVerifier`] turns an inbound
//! bearer token into [`VerifiedClaims`] (or an authentication error), and
//! [`IdentityResolver`] extracts the tenant identity from claims that are
//! already known to be valid. No code path re-derives trust from raw,
//! unverified material.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::constants::limits;
use crate::errors::{AppError, AppResult};
use crate::tenant::TenantIdentity;

/// Claims established by a successful external verification step
#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    /// Subject claim identifying the end user, if the token carried one
    pub subject: Option<String>,
}

/// Seam to the external authorization server. Implementations must return
/// `Ok` only for material whose validity has actually been established.
#[async_trait]
pub trait ClaimVerifier: Send + Sync {
    /// Verify the bearer token from the Authorization header, if any
    ///
    /// # Errors
    /// Returns an authentication error when the token is missing, rejected,
    /// inactive, or issued for a different resource.
    async fn verify(&self, bearer: Option<&str>) -> AppResult<VerifiedClaims>;
}

/// Extract the bearer token from an Authorization header value
///
/// # Errors
/// Returns an authentication error when the header is present but not of the
/// form `Bearer <token>`.
pub fn parse_bearer(header: Option<&str>) -> AppResult<Option<&str>> {
    match header {
        None => Ok(None),
        Some(value) => {
            let mut parts = value.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
                    Ok(Some(token))
                }
                _ => Err(AppError::auth_invalid(
                    "invalid authorization header format, expected: Bearer <token>",
                )),
            }
        }
    }
}

/// RFC 7662 introspection response fields this server consumes
#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    aud: Option<Value>,
}

/// Verifies tokens via RFC 7662 introspection against the configured
/// authorization server, validating the `active` flag and the audience claim
/// (RFC 8707) against this server's canonical resource URI.
pub struct IntrospectionVerifier {
    introspection_endpoint: String,
    resource_uri: String,
    http: reqwest::Client,
}

impl IntrospectionVerifier {
    /// Create a verifier for the given authorization server and resource URI
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(auth_server_url: &str, resource_uri: &str) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(limits::INTROSPECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal("failed to build introspection client").with_source(e))?;

        Ok(Self {
            introspection_endpoint: format!(
                "{}/admin/oauth2/introspect",
                auth_server_url.trim_end_matches('/')
            ),
            resource_uri: resource_uri.trim_end_matches('/').to_owned(),
            http,
        })
    }

    fn audience_matches(&self, aud: Option<&Value>) -> bool {
        match aud {
            Some(Value::String(s)) => s == &self.resource_uri,
            Some(Value::Array(items)) => items
                .iter()
                .any(|v| v.as_str() == Some(self.resource_uri.as_str())),
            _ => false,
        }
    }
}

#[async_trait]
impl ClaimVerifier for IntrospectionVerifier {
    #[tracing::instrument(skip(self, bearer), fields(subject = tracing::field::Empty))]
    async fn verify(&self, bearer: Option<&str>) -> AppResult<VerifiedClaims> {
        let Some(token) = bearer else {
            tracing::warn!("authentication failed: missing bearer token");
            return Err(AppError::auth_required());
        };

        let response = self
            .http
            .post(&self.introspection_endpoint)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("authorization server unreachable: {e}");
                AppError::new(
                    crate::errors::ErrorCode::ExternalServiceUnavailable,
                    "unable to validate token: authorization server unavailable",
                )
                .with_source(e)
            })?;

        if !response.status().is_success() {
            tracing::warn!("token introspection failed with status {}", response.status());
            return Err(AppError::auth_invalid("token validation failed"));
        }

        let info: IntrospectionResponse = response
            .json()
            .await
            .map_err(|e| AppError::auth_invalid("malformed introspection response").with_source(e))?;

        if !info.active {
            tracing::info!("token is not active");
            return Err(AppError::auth_invalid("token is not active"));
        }

        if !self.audience_matches(info.aud.as_ref()) {
            tracing::warn!(
                "token audience mismatch, expected {}",
                self.resource_uri
            );
            return Err(AppError::permission_denied(
                "token not issued for this resource",
            ));
        }

        if let Some(sub) = &info.sub {
            tracing::Span::current().record("subject", sub.as_str());
        }
        tracing::debug!("token validated successfully");

        Ok(VerifiedClaims { subject: info.sub })
    }
}

/// Verifier for single-tenant deployments with inbound auth disabled. Every
/// request runs as the sentinel tenant; no header is inspected.
pub struct SingleTenantVerifier;

#[async_trait]
impl ClaimVerifier for SingleTenantVerifier {
    async fn verify(&self, _bearer: Option<&str>) -> AppResult<VerifiedClaims> {
        Ok(VerifiedClaims {
            subject: Some(TenantIdentity::sentinel().as_str().to_owned()),
        })
    }
}

/// Extracts a tenant identity from already-verified claims
pub struct IdentityResolver;

impl IdentityResolver {
    /// Resolve the tenant identity from verified claims
    ///
    /// # Errors
    /// Returns an authentication-malformed error when the claims carry no
    /// usable subject. This is distinct from verification failure, which the
    /// [`ClaimVerifier`] has already ruled out.
    pub fn resolve_from_claims(claims: &VerifiedClaims) -> AppResult<TenantIdentity> {
        match &claims.subject {
            Some(subject) => TenantIdentity::new(subject),
            None => Err(AppError::auth_malformed(
                "verified token carries no subject claim",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer_variants() {
        assert_eq!(parse_bearer(None).unwrap(), None);
        assert_eq!(parse_bearer(Some("Bearer abc")).unwrap(), Some("abc"));
        assert_eq!(parse_bearer(Some("bearer abc")).unwrap(), Some("abc"));
        assert!(parse_bearer(Some("abc")).is_err());
        assert!(parse_bearer(Some("Basic dXNlcg==")).is_err());
        assert!(parse_bearer(Some("Bearer a b")).is_err());
    }

    #[test]
    fn test_resolver_requires_subject() {
        let claims = VerifiedClaims {
            subject: Some("alice".into()),
        };
        assert_eq!(
            IdentityResolver::resolve_from_claims(&claims)
                .unwrap()
                .as_str(),
            "alice"
        );

        let missing = VerifiedClaims { subject: None };
        let err = IdentityResolver::resolve_from_claims(&missing).unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::AuthMalformed);

        let blank = VerifiedClaims {
            subject: Some("   ".into()),
        };
        assert!(IdentityResolver::resolve_from_claims(&blank).is_err());
    }

    #[tokio::test]
    async fn test_single_tenant_verifier_returns_sentinel() {
        let claims = SingleTenantVerifier.verify(None).await.unwrap();
        let identity = IdentityResolver::resolve_from_claims(&claims).unwrap();
        assert!(identity.is_sentinel());
    }

    #[test]
    fn test_audience_matching() {
        let verifier =
            IntrospectionVerifier::new("https://auth.example.com", "https://mcp.example.com/")
                .unwrap();
        assert!(verifier.audience_matches(Some(&serde_json::json!("https://mcp.example.com"))));
        assert!(verifier.audience_matches(Some(&serde_json::json!([
            "https://other.example.com",
            "https://mcp.example.com"
        ]))));
        assert!(!verifier.audience_matches(Some(&serde_json::json!("https://evil.example.com"))));
        assert!(!verifier.audience_matches(None));
    }
}

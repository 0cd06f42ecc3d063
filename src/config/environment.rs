// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, auth modes, and runtime configuration parsing
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! Environment-based configuration management for production deployment

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::constants::defaults;

/// Authentication mode for inbound MCP calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Every request must carry a bearer token verified by the external
    /// authorization server; the verified subject selects the tenant.
    OAuth,
    /// No inbound authentication; every request runs as the sentinel tenant.
    SingleTenant,
}

/// Inbound authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Authentication mode
    pub mode: AuthMode,
    /// OAuth authorization server base URL (required in OAuth mode)
    pub server_url: Option<String>,
    /// Canonical URI of this MCP server, used for audience validation
    pub resource_uri: Option<String>,
}

/// Mealie backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealieConfig {
    /// Mealie API base URL, e.g. `http://mealie:9000/api`
    pub base_url: String,
    /// Optional fallback API token, used only by the sentinel tenant
    pub default_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

/// Credential mapping store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStoreConfig {
    /// Path to the `user_tokens.json` mapping file
    pub path: PathBuf,
    /// Cache TTL in seconds; 0 reloads the mapping on every lookup. The
    /// staleness window for newly added users equals this TTL.
    pub cache_ttl_secs: u64,
}

/// Complete server configuration loaded from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind port for the MCP transport
    pub http_port: u16,
    /// Mealie backend settings
    pub mealie: MealieConfig,
    /// Inbound auth settings
    pub auth: AuthConfig,
    /// Credential store settings
    pub tokens: TokenStoreConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable fails to parse, or if OAuth mode is
    /// enabled without `OAUTH_SERVER_URL` and `MCP_RESOURCE_URI`.
    pub fn from_env() -> Result<Self> {
        let http_port = env_parse("HTTP_PORT", defaults::HTTP_PORT)?;

        let mealie = MealieConfig {
            base_url: env::var("MEALIE_URL").unwrap_or_else(|_| defaults::MEALIE_URL.into()),
            default_token: env::var("MEALIE_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout_secs: env_parse("MEALIE_TIMEOUT_SECS", defaults::MEALIE_TIMEOUT_SECS)?,
            connect_timeout_secs: env_parse(
                "MEALIE_CONNECT_TIMEOUT_SECS",
                defaults::MEALIE_CONNECT_TIMEOUT_SECS,
            )?,
        };

        let require_auth = env::var("MCP_REQUIRE_AUTH")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let auth = if require_auth {
            let server_url = env::var("OAUTH_SERVER_URL")
                .context("OAUTH_SERVER_URL is required when MCP_REQUIRE_AUTH is enabled")?;
            let resource_uri = env::var("MCP_RESOURCE_URI")
                .context("MCP_RESOURCE_URI is required when MCP_REQUIRE_AUTH is enabled")?;
            if server_url.is_empty() || resource_uri.is_empty() {
                bail!("OAUTH_SERVER_URL and MCP_RESOURCE_URI must be non-empty");
            }
            AuthConfig {
                mode: AuthMode::OAuth,
                server_url: Some(server_url),
                resource_uri: Some(resource_uri),
            }
        } else {
            AuthConfig {
                mode: AuthMode::SingleTenant,
                server_url: None,
                resource_uri: None,
            }
        };

        let tokens = TokenStoreConfig {
            path: env::var("USER_TOKENS_PATH")
                .map_or_else(|_| PathBuf::from(defaults::USER_TOKENS_PATH), PathBuf::from),
            cache_ttl_secs: env_parse("USER_TOKENS_CACHE_TTL_SECS", defaults::TOKEN_CACHE_TTL_SECS)?,
        };

        Ok(Self {
            http_port,
            mealie,
            auth,
            tokens,
        })
    }

    /// One-line startup summary; never includes token values
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} mealie={} auth={:?} tokens={} ttl={}s default_token={}",
            self.http_port,
            self.mealie.base_url,
            self.auth.mode,
            self.tokens.path.display(),
            self.tokens.cache_ttl_secs,
            if self.mealie.default_token.is_some() {
                "set"
            } else {
                "unset"
            }
        )
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().with_context(|| format!("invalid {key}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "HTTP_PORT",
            "MEALIE_URL",
            "MEALIE_TOKEN",
            "MEALIE_TIMEOUT_SECS",
            "MEALIE_CONNECT_TIMEOUT_SECS",
            "MCP_REQUIRE_AUTH",
            "OAUTH_SERVER_URL",
            "MCP_RESOURCE_URI",
            "USER_TOKENS_PATH",
            "USER_TOKENS_CACHE_TTL_SECS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_single_tenant_defaults() {
        clear_env();
        env::set_var("MCP_REQUIRE_AUTH", "false");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http_port, defaults::HTTP_PORT);
        assert_eq!(config.mealie.base_url, defaults::MEALIE_URL);
        assert_eq!(config.auth.mode, AuthMode::SingleTenant);
        assert_eq!(config.tokens.cache_ttl_secs, 0);
    }

    #[test]
    #[serial]
    fn test_oauth_mode_requires_server_and_resource() {
        clear_env();
        env::set_var("MCP_REQUIRE_AUTH", "true");

        assert!(ServerConfig::from_env().is_err());

        env::set_var("OAUTH_SERVER_URL", "https://auth.example.com");
        env::set_var("MCP_RESOURCE_URI", "https://mcp.example.com");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.auth.mode, AuthMode::OAuth);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_summary_never_exposes_token() {
        clear_env();
        env::set_var("MCP_REQUIRE_AUTH", "false");
        env::set_var("MEALIE_TOKEN", "super-secret-token");

        let config = ServerConfig::from_env().unwrap();
        let summary = config.summary();
        assert!(!summary.contains("super-secret-token"));
        assert!(summary.contains("default_token=set"));
        clear_env();
    }
}

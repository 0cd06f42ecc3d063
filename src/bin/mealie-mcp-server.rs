// ABOUTME: Server binary wiring configuration, credential store, and MCP transport
// ABOUTME: Loads environment config, selects the auth mode, and serves until shutdown
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use mealie_mcp_server::auth::{ClaimVerifier, IntrospectionVerifier, SingleTenantVerifier};
use mealie_mcp_server::client::{initialize_shared_client, MealieClientFactory};
use mealie_mcp_server::config::{AuthMode, ServerConfig};
use mealie_mcp_server::logging;
use mealie_mcp_server::mcp::McpRequestProcessor;
use mealie_mcp_server::routes::{serve, AppState};
use mealie_mcp_server::tokens::UserTokenStore;

#[derive(Parser)]
#[command(
    name = "mealie-mcp-server",
    about = "MCP server exposing a Mealie recipe backend to AI assistants",
    version
)]
struct Args {
    /// HTTP port for the MCP transport (overrides HTTP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Path to the user token mapping file (overrides USER_TOKENS_PATH)
    #[arg(long)]
    user_tokens: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env().context("failed to initialize logging")?;

    let mut config = ServerConfig::from_env().context("invalid server configuration")?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(path) = args.user_tokens {
        config.tokens.path = path;
    }

    info!("starting mealie-mcp-server: {}", config.summary());

    initialize_shared_client(config.mealie.timeout_secs, config.mealie.connect_timeout_secs);

    let store = Arc::new(UserTokenStore::new(
        config.tokens.path.clone(),
        Duration::from_secs(config.tokens.cache_ttl_secs),
        config.mealie.default_token.clone(),
    ));
    // A malformed mapping is a deployment error and must fail startup, not
    // surface one lookup at a time.
    let users = store
        .reload()
        .await
        .context("user token mapping failed to load")?;
    if users == 0 && config.mealie.default_token.is_none() {
        warn!("no user tokens and no MEALIE_TOKEN configured, every call will be rejected");
    }

    let clients = Arc::new(
        MealieClientFactory::new(&config.mealie.base_url)
            .context("invalid MEALIE_URL")?,
    );
    let processor = Arc::new(McpRequestProcessor::new(store, clients));

    let verifier: Arc<dyn ClaimVerifier> = match config.auth.mode {
        AuthMode::OAuth => {
            let (Some(server_url), Some(resource_uri)) =
                (&config.auth.server_url, &config.auth.resource_uri)
            else {
                anyhow::bail!("OAuth mode requires OAUTH_SERVER_URL and MCP_RESOURCE_URI");
            };
            info!("inbound auth: OAuth token introspection against {server_url}");
            Arc::new(IntrospectionVerifier::new(server_url, resource_uri)?)
        }
        AuthMode::SingleTenant => {
            warn!("inbound auth disabled, all requests run as the default tenant");
            Arc::new(SingleTenantVerifier)
        }
    };

    let state = AppState::new(
        verifier,
        processor,
        config.auth.server_url.clone(),
        config.auth.resource_uri.clone(),
    );

    serve(state, config.http_port).await
}

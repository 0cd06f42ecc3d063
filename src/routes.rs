// ABOUTME: MCP Streamable HTTP transport on axum with OAuth bearer authentication
// ABOUTME: Binds the verified tenant identity to each request before dispatching
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! # Streamable HTTP Transport
//!
//! Implements the MCP Streamable HTTP transport: JSON-RPC over `POST /mcp`,
//! an SSE listen stream on `GET /mcp`, explicit session termination on
//! `DELETE /mcp`, and RFC 9728 protected resource metadata. Every request is
//! authenticated first; the resolved identity is bound to the serving task
//! for the duration of the dispatch and torn down with the scope on every
//! exit path.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use dashmap::DashMap;
use http::{header, HeaderMap, StatusCode};
use serde_json::json;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{parse_bearer, ClaimVerifier, IdentityResolver};
use crate::constants::jsonrpc_codes;
use crate::constants::limits;
use crate::constants::protocol::{
    PROTOCOL_VERSION_HEADER, SESSION_ID_HEADER, SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::errors::AppError;
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::McpRequestProcessor;
use crate::tenant::{run_with_identity, TenantIdentity};

/// Per-session state created on `initialize`
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Tenant the session was initialized by
    pub user: TenantIdentity,
    /// Negotiated MCP protocol version
    pub protocol_version: String,
}

/// Shared state for the MCP transport
#[derive(Clone)]
pub struct AppState {
    verifier: Arc<dyn ClaimVerifier>,
    processor: Arc<McpRequestProcessor>,
    sessions: Arc<DashMap<String, SessionInfo>>,
    auth_server_url: Option<String>,
    resource_uri: Option<String>,
}

impl AppState {
    /// Create transport state. `auth_server_url`/`resource_uri` are `None`
    /// when inbound auth is disabled.
    #[must_use]
    pub fn new(
        verifier: Arc<dyn ClaimVerifier>,
        processor: Arc<McpRequestProcessor>,
        auth_server_url: Option<String>,
        resource_uri: Option<String>,
    ) -> Self {
        Self {
            verifier,
            processor,
            sessions: Arc::new(DashMap::new()),
            auth_server_url,
            resource_uri,
        }
    }

    /// Authenticate the request and resolve the tenant identity
    async fn authenticate(&self, headers: &HeaderMap) -> Result<TenantIdentity, Response> {
        let result = async {
            let header = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());
            let bearer = parse_bearer(header)?;
            let claims = self.verifier.verify(bearer).await?;
            IdentityResolver::resolve_from_claims(&claims)
        }
        .await;

        result.map_err(|e| self.error_response(e))
    }

    /// Convert an error to a response, attaching the RFC 9728
    /// `WWW-Authenticate` challenge on authentication failures
    fn error_response(&self, e: AppError) -> Response {
        let challenge = (e.http_status() == 401).then(|| {
            self.resource_uri.as_ref().map(|uri| {
                format!("Bearer realm=\"mcp\", resource_metadata=\"{uri}/.well-known/oauth-protected-resource\"")
            })
        });

        let mut response = e.into_response();
        if let Some(Some(value)) = challenge {
            if let Ok(value) = value.parse() {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

/// Build the transport router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/mcp",
            get(mcp_listen).post(mcp_endpoint).delete(mcp_terminate),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(protected_resource_metadata),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// OAuth 2.0 Protected Resource Metadata (RFC 9728)
async fn protected_resource_metadata(State(state): State<AppState>) -> Response {
    let (Some(auth_server_url), Some(resource_uri)) =
        (&state.auth_server_url, &state.resource_uri)
    else {
        return AppError::not_found("OAuth metadata (auth disabled on this server)").into_response();
    };

    Json(json!({
        "resource": resource_uri,
        "authorization_servers": [auth_server_url],
        "bearer_methods_supported": ["header"],
    }))
    .into_response()
}

/// Main MCP endpoint: JSON-RPC messages over HTTP POST
async fn mcp_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let identity = match state.authenticate(&headers).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let protocol_version = headers
        .get(PROTOCOL_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(crate::constants::protocol::MCP_PROTOCOL_VERSION);
    if !SUPPORTED_PROTOCOL_VERSIONS.contains(&protocol_version) {
        return state.error_response(AppError::invalid_input(format!(
            "unsupported MCP protocol version: {protocol_version}"
        )));
    }

    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            let response =
                JsonRpcResponse::error(None, jsonrpc_codes::ERROR_PARSE, format!("Parse error: {e}"));
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    // Sessions are created on initialize and must match afterwards
    let presented_session = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let new_session = if request.method == "initialize" {
        let session_id = Uuid::new_v4().to_string();
        state.sessions.insert(
            session_id.clone(),
            SessionInfo {
                user: identity.clone(),
                protocol_version: protocol_version.to_owned(),
            },
        );
        info!(user = %identity, session = %session_id, "created MCP session");
        Some(session_id)
    } else {
        if let Some(session_id) = &presented_session {
            let Some(session) = state.sessions.get(session_id) else {
                return state.error_response(AppError::not_found("session (expired or unknown)"));
            };
            // The version negotiated at initialize is fixed for the session
            if session.protocol_version != protocol_version {
                return state.error_response(AppError::invalid_input(format!(
                    "protocol version {protocol_version} does not match the negotiated {}",
                    session.protocol_version
                )));
            }
        }
        None
    };

    // The identity binding lives exactly as long as this dispatch
    let response = run_with_identity(identity, state.processor.handle_request(request)).await;

    match response {
        Some(response) => {
            let mut http_response = Json(response).into_response();
            if let Some(session_id) = new_session {
                if let Ok(value) = session_id.parse() {
                    http_response
                        .headers_mut()
                        .insert(SESSION_ID_HEADER, value);
                }
            }
            http_response
        }
        None => (StatusCode::ACCEPTED, Json(json!({}))).into_response(),
    }
}

/// Listen endpoint: SSE stream for server-to-client messages. This server
/// does not initiate messages, so the stream only carries keepalive pings.
async fn mcp_listen(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = state.authenticate(&headers).await {
        return response;
    }

    let session_ok = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|session_id| state.sessions.contains_key(session_id));
    if !session_ok {
        return state.error_response(AppError::invalid_input(
            "valid Mcp-Session-Id required for listen endpoint",
        ));
    }

    let interval = tokio::time::interval(Duration::from_secs(limits::SSE_KEEPALIVE_SECS));
    let stream = IntervalStream::new(interval)
        .map(|_| Ok::<Event, Infallible>(Event::default().event("ping").data("")));

    Sse::new(stream).into_response()
}

/// Terminate session endpoint: the client explicitly ends its session
async fn mcp_terminate(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = state.authenticate(&headers).await {
        return response;
    }

    let removed = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|session_id| state.sessions.remove(session_id));

    match removed {
        Some((session_id, session)) => {
            debug!(user = %session.user, session = %session_id, "terminated MCP session");
            Json(json!({"message": "Session terminated"})).into_response()
        }
        None => AppError::not_found("session").into_response(),
    }
}

/// Bind and serve the transport until shutdown
///
/// # Errors
/// Returns an error if the listener cannot bind.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("MCP Streamable HTTP transport listening on port {port}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}

// ABOUTME: MCP request processing with per-call credential resolution
// ABOUTME: Drives each tools/call through identity, credential, and backend phases
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! # Request Dispatcher
//!
//! Every tools/call advances through four phases:
//! `Received → IdentityResolved → CredentialResolved → Completed`.
//! The identity comes from the task-local binding established by the
//! transport; the credential comes from the token store; the backend call
//! runs on a client bound to that credential. The terminal response carries
//! exactly one of result or typed error, and the dispatcher never retries.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::{protocol, tool_handlers};
use crate::client::MealieClientFactory;
use crate::constants::jsonrpc_codes;
use crate::constants::protocol::JSONRPC_VERSION;
use crate::errors::{AppError, AppResult};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::tenant::{current_identity, TenantIdentity};
use crate::tokens::UserTokenStore;

/// Progress of a single inbound call through the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    /// Call accepted, nothing resolved yet
    Received,
    /// Caller identity extracted from the request binding
    IdentityResolved,
    /// Backend credential resolved for the identity
    CredentialResolved,
    /// Terminal: result or one typed error
    Completed,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::IdentityResolved => "identity_resolved",
            Self::CredentialResolved => "credential_resolved",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Processes MCP protocol requests with validation, routing, and execution
pub struct McpRequestProcessor {
    store: Arc<UserTokenStore>,
    clients: Arc<MealieClientFactory>,
}

impl McpRequestProcessor {
    /// Create a new MCP request processor
    #[must_use]
    pub const fn new(store: Arc<UserTokenStore>, clients: Arc<MealieClientFactory>) -> Self {
        Self { store, clients }
    }

    /// Handle an MCP request and return a response, or `None` for
    /// notifications
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() || request.method.starts_with("notifications/") {
            debug!(method = %request.method, "received notification");
            return None;
        }

        Some(self.process_or_error(request).await)
    }

    async fn process_or_error(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let method = request.method.clone();
        match self.process_request(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(method = %method, "failed to process MCP request: {e:#}");
                JsonRpcResponse::error_with_data(
                    id,
                    e.jsonrpc_code(),
                    e.to_string(),
                    json!({"code": e.code}),
                )
            }
        }
    }

    async fn process_request(&self, request: JsonRpcRequest) -> AppResult<JsonRpcResponse> {
        Self::validate_request(&request)?;

        match request.method.as_str() {
            "initialize" => Ok(JsonRpcResponse::success(
                request.id,
                protocol::initialize_result(),
            )),
            "ping" => Ok(JsonRpcResponse::success(request.id, json!({}))),
            "tools/list" => Ok(JsonRpcResponse::success(request.id, protocol::tools_list())),
            "tools/call" => self.handle_tools_call(request).await,
            other => {
                warn!("unknown MCP method: {other}");
                Ok(JsonRpcResponse::error(
                    request.id,
                    jsonrpc_codes::ERROR_METHOD_NOT_FOUND,
                    format!("Method not found: {other}"),
                ))
            }
        }
    }

    /// Validate MCP request format and required fields
    fn validate_request(request: &JsonRpcRequest) -> AppResult<()> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(AppError::invalid_input(format!(
                "invalid JSON-RPC version: got '{}', expected '{JSONRPC_VERSION}'",
                request.jsonrpc
            )));
        }
        if request.method.is_empty() {
            return Err(AppError::invalid_input("missing method"));
        }
        Ok(())
    }

    async fn handle_tools_call(&self, request: JsonRpcRequest) -> AppResult<JsonRpcResponse> {
        let params = request.params.unwrap_or_else(|| json!({}));
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::invalid_input("tools/call requires a tool name"))?
            .to_owned();
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let mut phase = DispatchPhase::Received;
        debug!(tool = %name, %phase, "dispatching tool call");

        // An absent binding means "no authenticated caller": run as the
        // explicit sentinel tenant rather than crashing or guessing.
        let identity = current_identity().unwrap_or_else(TenantIdentity::sentinel);
        phase = DispatchPhase::IdentityResolved;
        debug!(tool = %name, user = %identity, %phase, "identity bound");

        let credential = self.store.resolve(&identity).await?;
        phase = DispatchPhase::CredentialResolved;
        debug!(tool = %name, user = %identity, %phase, "credential resolved");

        let client = self.clients.client_for(&credential);
        let result = tool_handlers::call(&client, &name, arguments).await?;

        phase = DispatchPhase::Completed;
        debug!(tool = %name, user = %identity, %phase, "tool call finished");

        let text = serde_json::to_string_pretty(&result)
            .map_err(|e| AppError::serialization("failed to encode tool result").with_source(e))?;

        Ok(JsonRpcResponse::success(
            request.id,
            json!({
                "content": [{"type": "text", "text": text}],
                "isError": false,
            }),
        ))
    }
}

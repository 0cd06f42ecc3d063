// ABOUTME: Main library entry point for the Mealie MCP server
// ABOUTME: Routes authenticated MCP callers to per-user Mealie API credentials
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

#![deny(unsafe_code)]

//! # Mealie MCP Server
//!
//! A Model Context Protocol (MCP) server exposing a self-hosted
//! [Mealie](https://mealie.io) recipe library to AI assistants. One server
//! process serves many end users: each inbound call is authenticated against
//! an external OAuth authorization server, the verified subject is mapped to
//! that user's Mealie API token, and the whole call tree runs with the
//! resolved credential bound to the request.
//!
//! ## Architecture
//!
//! - **Auth**: [`auth::ClaimVerifier`] consumes the verdict of the external
//!   authorization server; [`auth::IdentityResolver`] extracts the tenant
//!   identity from verified claims.
//! - **Tenant context**: [`tenant`] binds the identity to the request's task
//!   via a task-local scope, isolating concurrent callers.
//! - **Credential store**: [`tokens::UserTokenStore`] maps identities to
//!   Mealie API tokens, hot-reloading the mapping file without a restart.
//! - **Client factory**: [`client::MealieClientFactory`] builds Mealie
//!   clients bound to exactly one credential.
//! - **Dispatcher**: [`mcp::dispatcher::McpRequestProcessor`] turns JSON-RPC
//!   messages into credentialed backend calls.
//! - **Transport**: [`routes`] implements the MCP Streamable HTTP transport
//!   on axum.

/// Token verification seam and identity resolution
pub mod auth;

/// Mealie HTTP client and tenant-scoped client factory
pub mod client;

/// Configuration management
pub mod config;

/// Application constants grouped by domain
pub mod constants;

/// Unified error handling
pub mod errors;

/// JSON-RPC 2.0 foundation shared by the MCP transport
pub mod jsonrpc;

/// Logging configuration and structured logging setup
pub mod logging;

/// MCP protocol handling: dispatcher, tool schemas, tool handlers
pub mod mcp;

/// Mealie API wire models
pub mod models;

/// Streamable HTTP transport routes
pub mod routes;

/// Tenant identity and request-scoped context carrier
pub mod tenant;

/// Per-user credential mapping store
pub mod tokens;

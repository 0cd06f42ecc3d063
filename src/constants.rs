// ABOUTME: Application constants organized by domain
// ABOUTME: Protocol versions, JSON-RPC codes, environment defaults, and operational limits
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! Constants module
//!
//! Constants are grouped into logical domains rather than a single flat list.

/// MCP protocol constants
pub mod protocol {
    /// JSON-RPC version string
    pub const JSONRPC_VERSION: &str = "2.0";

    /// Server name advertised in the MCP initialize response
    pub const SERVER_NAME: &str = "mealie-mcp-server";

    /// Preferred MCP protocol version
    pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

    /// Protocol versions this transport accepts
    pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26"];

    /// Session correlation header (MCP Streamable HTTP transport)
    pub const SESSION_ID_HEADER: &str = "mcp-session-id";

    /// Protocol version negotiation header
    pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";
}

/// JSON-RPC error codes surfaced through the MCP boundary
pub mod jsonrpc_codes {
    /// Parse error - invalid JSON
    pub const ERROR_PARSE: i32 = -32700;

    /// Invalid JSON-RPC request
    pub const ERROR_INVALID_REQUEST: i32 = -32600;

    /// Method not found
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid params
    pub const ERROR_INVALID_PARAMS: i32 = -32602;

    /// Internal error
    pub const ERROR_INTERNAL_ERROR: i32 = -32603;

    /// Caller is not authenticated (missing, invalid, or malformed token)
    pub const ERROR_UNAUTHORIZED: i32 = -32001;

    /// Verified identity has no Mealie credential configured
    pub const ERROR_TENANT_NOT_PROVISIONED: i32 = -32002;

    /// Mealie rejected the resolved credential
    pub const ERROR_BACKEND_AUTH_FAILED: i32 = -32003;

    /// Mealie (or the authorization server) is unreachable
    pub const ERROR_BACKEND_UNAVAILABLE: i32 = -32004;

    /// Credential mapping source is malformed
    pub const ERROR_CONFIGURATION: i32 = -32005;

    /// Requested backend resource does not exist
    pub const ERROR_RESOURCE_NOT_FOUND: i32 = -32006;
}

/// Environment variable defaults
pub mod defaults {
    /// Default HTTP bind port
    pub const HTTP_PORT: u16 = 8080;

    /// Default Mealie API base URL
    pub const MEALIE_URL: &str = "http://localhost:9000/api";

    /// Default path to the user token mapping file
    pub const USER_TOKENS_PATH: &str = "config/user_tokens.json";

    /// Default Mealie request timeout in seconds
    pub const MEALIE_TIMEOUT_SECS: u64 = 30;

    /// Default connect timeout in seconds
    pub const MEALIE_CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Default credential cache TTL in seconds (0 = reload on every lookup)
    pub const TOKEN_CACHE_TTL_SECS: u64 = 0;

    /// Sentinel tenant identity for single-tenant / unauthenticated mode
    pub const SENTINEL_TENANT: &str = "default";
}

/// Operational limits
pub mod limits {
    /// Default recipe search page size
    pub const DEFAULT_SEARCH_LIMIT: u64 = 20;

    /// Maximum recipe search page size accepted from callers
    pub const MAX_SEARCH_LIMIT: u64 = 100;

    /// SSE keepalive interval for the listen endpoint, in seconds
    pub const SSE_KEEPALIVE_SECS: u64 = 30;

    /// Timeout for authorization server introspection calls, in seconds
    pub const INTROSPECTION_TIMEOUT_SECS: u64 = 10;
}

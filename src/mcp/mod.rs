// ABOUTME: MCP protocol implementation: dispatcher, protocol payloads, tool handlers
// ABOUTME: Turns JSON-RPC messages into credentialed Mealie calls for the bound tenant
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

/// Request dispatcher and per-call state machine
pub mod dispatcher;

/// Protocol payloads: initialize, ping, tool schemas
pub mod protocol;

/// tools/call routing to typed Mealie client calls
pub mod tool_handlers;

pub use dispatcher::McpRequestProcessor;

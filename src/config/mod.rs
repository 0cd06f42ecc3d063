// ABOUTME: Configuration module grouping environment-driven server settings
// ABOUTME: All runtime configuration is sourced from environment variables
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

/// Environment-based configuration management
pub mod environment;

pub use environment::{AuthConfig, AuthMode, MealieConfig, ServerConfig, TokenStoreConfig};

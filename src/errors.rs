// ABOUTME: Unified error handling system with typed codes for every failure class
// ABOUTME: Maps each error to an HTTP status and a JSON-RPC error code for the MCP boundary
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! # Unified Error Handling
//!
//! Every failure in the credential-routing path maps to exactly one
//! [`ErrorCode`], so callers and operators can always distinguish
//! "not authenticated" from "valid login, no Mealie account provisioned"
//! from "Mealie rejected the resolved token". Errors are recovered at the
//! dispatcher boundary into a single typed response; no raw internal error
//! crosses it unclassified.

use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::jsonrpc_codes;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Caller authentication (1000-1999)
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 1000,
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid = 1001,
    #[serde(rename = "AUTH_MALFORMED")]
    AuthMalformed = 1002,
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied = 1003,

    // Tenant provisioning (2000-2999)
    #[serde(rename = "TENANT_NOT_PROVISIONED")]
    TenantNotProvisioned = 2000,

    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,

    // Resources (4000-4999)
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,

    // External services (5000-5999)
    #[serde(rename = "BACKEND_AUTH_FAILED")]
    BackendAuthFailed = 5000,
    #[serde(rename = "BACKEND_UNAVAILABLE")]
    BackendUnavailable = 5001,
    #[serde(rename = "BACKEND_ERROR")]
    BackendError = 5002,
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5003,

    // Configuration (6000-6999)
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 6000,

    // Internal (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9001,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidInput => 400,

            // 401 Unauthorized
            Self::AuthRequired | Self::AuthInvalid | Self::AuthMalformed => 401,

            // 403 Forbidden - authenticated but not usable; TenantNotProvisioned
            // is deliberately separate from the 401 family so operators can tell
            // "valid login, no Mealie account" apart from "invalid login"
            Self::PermissionDenied | Self::TenantNotProvisioned => 403,

            // 404 Not Found
            Self::ResourceNotFound => 404,

            // 502 Bad Gateway - Mealie rejected or misbehaved
            Self::BackendAuthFailed | Self::BackendError => 502,

            // 503 Service Unavailable
            Self::BackendUnavailable | Self::ExternalServiceUnavailable => 503,

            // 500 Internal Server Error
            Self::ConfigInvalid | Self::InternalError | Self::SerializationError => 500,
        }
    }

    /// Get the JSON-RPC error code surfaced through the MCP boundary
    #[must_use]
    pub const fn jsonrpc_code(self) -> i32 {
        match self {
            Self::AuthRequired
            | Self::AuthInvalid
            | Self::AuthMalformed
            | Self::PermissionDenied => jsonrpc_codes::ERROR_UNAUTHORIZED,
            Self::TenantNotProvisioned => jsonrpc_codes::ERROR_TENANT_NOT_PROVISIONED,
            Self::BackendAuthFailed => jsonrpc_codes::ERROR_BACKEND_AUTH_FAILED,
            Self::BackendUnavailable | Self::ExternalServiceUnavailable => {
                jsonrpc_codes::ERROR_BACKEND_UNAVAILABLE
            }
            Self::ConfigInvalid => jsonrpc_codes::ERROR_CONFIGURATION,
            Self::InvalidInput => jsonrpc_codes::ERROR_INVALID_PARAMS,
            Self::ResourceNotFound => jsonrpc_codes::ERROR_RESOURCE_NOT_FOUND,
            Self::BackendError | Self::InternalError | Self::SerializationError => {
                jsonrpc_codes::ERROR_INTERNAL_ERROR
            }
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::AuthInvalid => "The provided authentication credentials are invalid",
            Self::AuthMalformed => "The verified authentication material is malformed",
            Self::PermissionDenied => "You do not have permission to perform this action",
            Self::TenantNotProvisioned => "No Mealie account is provisioned for this user",
            Self::InvalidInput => "The provided input is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::BackendAuthFailed => "Mealie rejected the configured API token",
            Self::BackendUnavailable => "Mealie is unreachable",
            Self::BackendError => "Mealie returned an unexpected error",
            Self::ExternalServiceUnavailable => "An external service is currently unavailable",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::InternalError => "An internal server error occurred",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message; never contains credential values
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Get the JSON-RPC error code for this error
    #[must_use]
    pub const fn jsonrpc_code(&self) -> i32 {
        self.code.jsonrpc_code()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorResponseDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    pub code: ErrorCode,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = axum::http::StatusCode::from_u16(self.http_status())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}

/// Convenience constructors for common errors
impl AppError {
    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Invalid authentication
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Verified auth material could not be interpreted (e.g. missing subject)
    pub fn auth_malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthMalformed, message)
    }

    /// Permission denied (e.g. token issued for a different resource)
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Verified identity has no configured Mealie credential
    pub fn tenant_not_provisioned(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TenantNotProvisioned, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Mealie rejected the resolved credential at call time
    pub fn backend_auth_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BackendAuthFailed, message)
    }

    /// Transport-level failure reaching Mealie
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BackendUnavailable, message)
    }

    /// Mealie returned an unexpected status
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BackendError, message)
    }

    /// Configuration source is malformed
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Serialization failure
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }
}

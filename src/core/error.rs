//! # Error Handling Module
//!
//! Comprehensive error handling for the gateway using the `thiserror` crate.
//! It defines all error types that can occur while bridging requests and
//! provides the HTTP status code mapping used for client responses.
//!
//! The wire format of an error response is the original gateway's JSON body:
//! `{"error": <short name>, "message": <detail>, "status": "<code>"}`.
//! User-visible failures always carry enough detail to distinguish
//! "rejected before backend" from "backend failed" from "backend unavailable".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tonic::Code;

/// Main result type used throughout the gateway
///
/// Type alias that makes error handling more ergonomic: `GatewayResult<T>`
/// instead of `Result<T, GatewayError>` everywhere.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error types for the gateway
///
/// Each variant represents a different category of error. The `#[error("...")]`
/// attribute from `thiserror` implements the `Display` trait with the given
/// message.
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    /// Configuration-related errors (invalid config, missing files, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Rate limiting errors when request limits are exceeded
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimitExceeded,

    /// The backend service is unavailable or unreachable
    #[error("Service unavailable: {service} - {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// Request timeout errors
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A backend call returned a gRPC error status
    #[error("Backend error ({code:?}): {message}")]
    Backend { code: Code, message: String },

    /// Protocol-specific errors (malformed SSE state, WebSocket failures, etc.)
    #[error("Protocol error ({protocol}): {message}")]
    Protocol { protocol: String, message: String },

    /// Request validation errors (invalid headers, malformed body, etc.)
    #[error("Request validation failed: {reason}")]
    RequestValidation { reason: String },

    /// WebSocket/SSE transport errors on the browser-facing side
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Internal server errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// I/O errors (bind failures, network errors, etc.)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },
}

impl GatewayError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a service unavailable error
    pub fn service_unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a transport error with a custom message
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(reason: S) -> Self {
        Self::RequestValidation {
            reason: reason.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    ///
    /// Maps internal error types to the HTTP status codes returned to
    /// clients. Backend errors use the standard gRPC-code mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::RequestValidation { .. } => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Backend { code, .. } => grpc_code_to_http(*code),
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Protocol { .. } => StatusCode::BAD_REQUEST,
            Self::Transport { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Json { .. } => StatusCode::BAD_REQUEST,
            Self::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short error name used in the JSON response body
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "Configuration Error",
            Self::RateLimitExceeded => "Too Many Requests",
            Self::ServiceUnavailable { .. } => "Service Unavailable",
            Self::Timeout { .. } => "Gateway Timeout",
            Self::Backend { .. } => "Backend Error",
            Self::Protocol { .. } => "Protocol Error",
            Self::RequestValidation { .. } => "Bad Request",
            Self::Transport { .. } => "Transport Error",
            Self::Internal { .. } => "Internal Server Error",
            Self::Io { .. } => "Internal Server Error",
            Self::Json { .. } => "Bad Request",
            Self::Yaml { .. } => "Configuration Error",
        }
    }
}

/// Map a gRPC status code to the HTTP status returned to the browser
pub fn grpc_code_to_http(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => StatusCode::REQUEST_TIMEOUT,
        Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::BAD_REQUEST,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
    }
}

/// Implement conversion from std::io::Error
impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Implement conversion from serde_json::Error
impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

/// Implement conversion from serde_yaml::Error
impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

/// Implement conversion from tonic::Status for per-call backend errors
impl From<tonic::Status> for GatewayError {
    fn from(status: tonic::Status) -> Self {
        Self::Backend {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// Implement conversion from tonic transport errors (dial failures)
impl From<tonic::transport::Error> for GatewayError {
    fn from(err: tonic::transport::Error) -> Self {
        Self::ServiceUnavailable {
            service: "greeter".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Implement conversion from axum errors (WebSocket send/receive failures)
impl From<axum::Error> for GatewayError {
    fn from(err: axum::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Implement `IntoResponse` so handlers can bubble errors with `?`
///
/// Axum converts the error into the gateway's JSON error body with the
/// appropriate status code.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = json!({
            "error": self.error_type(),
            "message": self.to_string(),
            "status": status.as_u16().to_string(),
        });

        (status, Json(body)).into_response()
    }
}

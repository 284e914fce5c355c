use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the entire application
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Avatar upload failed: {0}")]
    UploadFailed(String),

    #[error("Dependency unavailable: {0}")]
    TransientDependency(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    RateLimit(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, IdentityError>;

impl IdentityError {
    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        Self::Internal(msg.into())
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            IdentityError::Conflict(_) => "conflict",
            IdentityError::Unauthorized(_) => "unauthorized",
            IdentityError::NotFound(_) => "not_found",
            IdentityError::UploadFailed(_) => "upload_failed",
            IdentityError::TransientDependency(_) => "transient_dependency",
            IdentityError::Validation(_) => "validation",
            IdentityError::RateLimit(_) => "rate_limit",
            IdentityError::Storage(_) => "storage",
            IdentityError::Config(_) => "config",
            IdentityError::Internal(_) => "internal",
        }
    }

    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            IdentityError::Conflict(_) => 409,
            IdentityError::Unauthorized(_) => 401,
            IdentityError::NotFound(_) => 404,
            IdentityError::UploadFailed(_) => 502,
            IdentityError::TransientDependency(_) => 503,
            IdentityError::Validation(_) => 400,
            IdentityError::RateLimit(_) => 429,
            IdentityError::Storage(_) => 500,
            IdentityError::Config(_) => 500,
            IdentityError::Internal(_) => 500,
        }
    }

    /// Message safe to hand to API clients. Server-side faults are
    /// collapsed to a generic text; the detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            IdentityError::Storage(_) | IdentityError::Config(_) | IdentityError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Convert to JSON using the API response envelope
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "error",
            "code": self.http_status_code(),
            "message": self.public_message(),
        })
    }
}

impl ResponseError for IdentityError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        if self.http_status_code() >= 500 {
            tracing::error!(category = self.category(), "Request failed: {}", self);
        }
        HttpResponse::build(self.status_code()).json(self.to_json())
    }
}

// Serialization error conversions
impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::Internal(format!("JSON error: {}", err))
    }
}

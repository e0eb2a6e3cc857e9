//! Error types for the tiered cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in any tier
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid request data or configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Persisted entry is unreadable or malformed
    #[error("Corrupt entry for key '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// A single entry is larger than the tier can ever hold
    #[error("Entry of {size_bytes} bytes exceeds {tier} tier capacity of {capacity_bytes} bytes")]
    CapacityExceeded {
        tier: &'static str,
        size_bytes: u64,
        capacity_bytes: u64,
    },

    /// Durable storage failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Disk operation exceeded the caller's deadline
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Wraps an I/O failure with the operation and path it happened on.
    pub fn storage(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        CacheError::StorageUnavailable(format!("{context}: {err}"))
    }

    /// Returns true for conditions the cache absorbs by degrading to memory-only
    /// behavior instead of failing the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::Corrupt { .. }
                | CacheError::StorageUnavailable(_)
                | CacheError::Timeout { .. }
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidKey(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::CapacityExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::StorageUnavailable(_) | CacheError::Timeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Corrupt { .. } | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

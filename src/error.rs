//! Error types for the cache manager
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
/// Unified error type for cache operations.
///
/// A missing key is not an error: reads return the type's default value.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing store unreachable, connection dropped or timed out
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// Payload could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    SerializationError(String),

    /// Store answered, but with a command error
    #[error("Cache backend error: {0}")]
    BackendError(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializationError(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            CacheError::ConnectionError(err.to_string())
        } else {
            CacheError::BackendError(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::SerializationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::ConnectionError(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::BackendError(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

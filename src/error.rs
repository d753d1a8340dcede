//! Error types for the storefront state layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == App Error Enum ==
/// Unified error type for fetches, admin writes and the local HTTP surface.
///
/// `Clone` is required because a single failed remote read is handed to
/// every caller sharing the collapsed in-flight request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Remote API could not be reached
    #[error("Network failure: {0}")]
    Network(String),

    /// Remote API answered with a non-success status
    #[error("Remote returned {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    /// Remote API answered 2xx but reported `success: false`
    #[error("Remote rejected the request: {0}")]
    Rejected(String),

    /// Remote payload could not be decoded into the expected shape
    #[error("Malformed remote payload: {0}")]
    MalformedPayload(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::MalformedPayload(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Network(_)
            | AppError::RemoteStatus { .. }
            | AppError::Rejected(_)
            | AppError::MalformedPayload(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Storage Error Enum ==
/// Failure of the durable storage backend.
///
/// Never escapes the storage helpers: callers degrade to in-memory state.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage document is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend unavailable")]
    Unavailable,
}

// == Result Type Alias ==
/// Convenience Result type for the state layer.
pub type Result<T> = std::result::Result<T, AppError>;

//! Error types for the ledger core and its HTTP surface.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why a candidate block does not extend its declared parent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("non-contiguous index: expected {expected}, got {got}")]
    NonContiguousIndex { expected: u64, got: u64 },

    #[error("prev_hash mismatch: expected {expected}, got {got}")]
    PrevHashMismatch { expected: String, got: String },

    #[error("hash mismatch: stored {stored}, recomputed {recomputed}")]
    HashMismatch { stored: String, recomputed: String },

    #[error("genesis block must have index 0 and an empty prev_hash")]
    MalformedGenesis,

    #[error("proposed chain diverges from the canonical chain at block {position}")]
    DivergentHistory { position: usize },
}

/// Errors raised while building blocks or handling proposed chains.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("timestamp format error: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error("proposed chain is empty")]
    EmptyChain,
}

/// Startup configuration errors. Any of these is fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to read .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

/// Gateway errors, each carrying the body echoed back to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body did not decode; the raw body is echoed.
    #[error("malformed request body")]
    BadRequest(Vec<u8>),

    /// The append was rejected or could not be built; the decoded payload is echoed.
    #[error("append failed")]
    Internal(String),
}

/// Body written when a response itself cannot be serialized.
pub const INTERNAL_ERROR_BODY: &str = "HTTP 500: Internal Server Error";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(raw) => (StatusCode::BAD_REQUEST, raw).into_response(),
            ApiError::Internal(echo) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                echo,
            )
                .into_response(),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

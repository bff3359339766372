//! Error types and Axum response conversions.

use crate::storage::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid address")]
    InvalidAddress,

    #[error("nonce not found")]
    NonceNotFound,

    #[error("nonce expired")]
    NonceExpired,

    #[error("invalid nonce")]
    NonceMismatch,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("malformed token")]
    MalformedToken,

    #[error("invalid token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Short machine-readable name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidAddress => "invalid_address",
            AuthError::NonceNotFound => "nonce_not_found",
            AuthError::NonceExpired => "nonce_expired",
            AuthError::NonceMismatch => "nonce_mismatch",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::MalformedToken => "malformed_token",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "expired",
            AuthError::UpstreamFailure(_) => "upstream_failure",
            AuthError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::UpstreamFailure(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidAddress => AppError::BadRequest("Invalid address".to_string()),
            AuthError::NonceNotFound => AppError::Unauthorized("Nonce not found".to_string()),
            AuthError::NonceExpired => AppError::Unauthorized("Nonce expired".to_string()),
            AuthError::NonceMismatch => AppError::Unauthorized("Invalid nonce".to_string()),
            AuthError::InvalidSignature => {
                AppError::Unauthorized("Invalid signature".to_string())
            }
            AuthError::MalformedToken | AuthError::BadSignature => {
                AppError::Unauthorized("Invalid token".to_string())
            }
            AuthError::Expired => AppError::Unauthorized("Token expired".to_string()),
            AuthError::UpstreamFailure(msg) => AppError::Internal(format!("Upstream: {}", msg)),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

//! Axum state and the bearer-token extractor.

use super::address::Address;
use super::service::AuthService;
use super::session::Claims;
use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

/// Authenticated session extractor.
///
/// Extracts the session from an `Authorization: Bearer {token}` header and
/// hands the verified address to the handler. Returns 401 Unauthorized if
/// the header is missing or the token does not validate.
pub struct AuthSession {
    pub address: Address,
    pub claims: Claims,
}

/// Pull the token out of an `Authorization` header value. The scheme name
/// is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let token = bearer_token(auth_header)
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))?;

        let claims = state.auth.verify_token(token).map_err(|e| {
            tracing::debug!(reason = e.kind(), "Session rejected");
            AppError::from(e)
        })?;

        // Claims are validated to hold a well-formed address
        let address = claims
            .address
            .parse::<Address>()
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

        Ok(AuthSession { address, claims })
    }
}

//! Auth API endpoints.

use crate::auth::middleware::{AppState, AuthSession};
use crate::error::AppError;
use crate::models::{LoginRequest, MeResponse, NonceQuery, VerifyResponse};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

/// GET /api/auth/nonce?address= — Issue a login challenge
pub async fn get_nonce(
    State(state): State<AppState>,
    Query(query): Query<NonceQuery>,
) -> Result<impl IntoResponse, AppError> {
    let address = query
        .address
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("address parameter is required".to_string()))?;

    let response = state.auth.generate_nonce(&address).await?;

    Ok(Json(response))
}

/// POST /api/auth/login — Verify signed challenge and mint a session token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth.login(&req).await?;

    Ok(Json(response))
}

/// POST /api/auth/verify — Check the bearer token
pub async fn verify(session: AuthSession) -> Result<impl IntoResponse, AppError> {
    Ok(Json(VerifyResponse {
        address: session.address.to_string(),
        issued_at: session.claims.iat,
        expires_at: session.claims.exp,
    }))
}

/// GET /api/auth/me — Address of the authenticated caller
pub async fn me(session: AuthSession) -> Result<impl IntoResponse, AppError> {
    Ok(Json(MeResponse {
        address: session.address.to_string(),
    }))
}

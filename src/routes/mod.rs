//! API route handlers.

pub mod auth;

use crate::auth::middleware::AppState;
use axum::{routing::get, routing::post, Router};

async fn health() -> &'static str {
    "OK"
}

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        // Auth endpoints
        .route("/api/auth/nonce", get(auth::get_nonce))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify", post(auth::verify))
        .route("/api/auth/me", get(auth::me))
}

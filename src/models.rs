//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models represent persisted data structures.

use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Models
// ============================================================================

/// Query string for `GET /api/auth/nonce`.
#[derive(Debug, Deserialize)]
pub struct NonceQuery {
    pub address: Option<String>,
}

/// Response containing the nonce to embed in the login message.
#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub nonce: String, // hex
}

/// Request to log in with a signed challenge.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub address: String,
    pub nonce: String,
    pub signature: String, // hex, 65 bytes
}

/// Response after successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub address: String,
}

/// Response describing a valid session token.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub address: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// Response for the authenticated caller.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub address: String,
}

// ============================================================================
// Storage Models
// ============================================================================

/// Outstanding challenge for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChallenge {
    pub nonce: String,
    pub expires_at: u64,
}

/// User record, keyed by canonical address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub address: String,
    pub created_at: u64,
}

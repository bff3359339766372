//! Stateless session tokens (HS256 JWT).
//!
//! A token carries `{address, iat, exp}` signed with the service secret.
//! Nothing is stored server-side; validity depends only on the token.

use super::address::Address;
use crate::clock::Clock;
use crate::error::AuthError;
use base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default session lifetime (24 hours).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;

const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub address: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        // Expiry is checked against our clock, not jsonwebtoken's
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            clock,
            ttl_secs,
        }
    }

    /// Mint a token for `address`, valid for the configured TTL from now.
    pub fn mint(&self, address: &Address) -> Result<String, AuthError> {
        let iat = self.clock.now_secs();
        let exp = iat
            .checked_add(self.ttl_secs)
            .ok_or_else(|| AuthError::Internal("Token expiry overflows".to_string()))?;
        let claims = Claims {
            address: address.to_string(),
            iat,
            exp,
        };

        jsonwebtoken::encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Validate `token` and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        // Reject anything not signed with our algorithm before touching the
        // signature, including `none`
        if header_algorithm(token)? != "HS256" {
            return Err(AuthError::BadSignature);
        }

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::BadSignature
                }
                _ => AuthError::MalformedToken,
            })?;
        let claims = data.claims;

        if claims.address.parse::<Address>().is_err() {
            return Err(AuthError::MalformedToken);
        }

        if self.clock.now_secs() >= claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }
}

/// Read the `alg` field of a compact JWT header.
fn header_algorithm(token: &str) -> Result<String, AuthError> {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedToken);
    };

    let raw = general_purpose::URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| AuthError::MalformedToken)?;
    let header: RawHeader = serde_json::from_slice(&raw).map_err(|_| AuthError::MalformedToken)?;

    Ok(header.alg)
}

//! Single-use login challenges.
//!
//! One outstanding nonce per address. Issuing replaces any previous nonce.
//! Consuming always removes the stored nonce first, whatever the outcome,
//! so a nonce can be checked at most once: a wrong guess burns it and an
//! expired one is discarded.

use super::address::Address;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::models::StoredChallenge;
use crate::storage::ChallengeStore;
use rand::Rng;
use std::sync::Arc;

/// Random bytes per nonce (hex-encoded to 32 characters).
pub const NONCE_BYTES: usize = 16;

/// Default challenge lifetime.
pub const DEFAULT_NONCE_TTL_SECS: u64 = 300;

/// Generate a cryptographically random nonce.
pub fn generate_nonce() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; NONCE_BYTES];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

pub struct NonceRegistry {
    store: Arc<dyn ChallengeStore>,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
}

impl NonceRegistry {
    pub fn new(store: Arc<dyn ChallengeStore>, clock: Arc<dyn Clock>, ttl_secs: u64) -> Self {
        Self {
            store,
            clock,
            ttl_secs,
        }
    }

    /// Issue a fresh nonce for `address`, replacing any outstanding one.
    pub async fn issue(&self, address: &str) -> Result<String, AuthError> {
        let address: Address = address.parse().map_err(|_| AuthError::InvalidAddress)?;

        let now = self.clock.now_secs();
        let expires_at = now
            .checked_add(self.ttl_secs)
            .ok_or_else(|| AuthError::Internal("Nonce expiry overflows".to_string()))?;
        let nonce = generate_nonce();
        let challenge = StoredChallenge {
            nonce: nonce.clone(),
            expires_at,
        };

        self.store.put(&address, challenge, now).await?;

        tracing::debug!(action = "nonce_issued", address = %address, "Challenge issued");
        Ok(nonce)
    }

    /// Consume the outstanding nonce for `address`, checking it against
    /// `supplied`.
    pub async fn consume(&self, address: &str, supplied: &str) -> Result<(), AuthError> {
        let address: Address = address.parse().map_err(|_| AuthError::InvalidAddress)?;

        // Taking is atomic: of two concurrent attempts only one sees the entry
        let challenge = self
            .store
            .take(&address)
            .await?
            .ok_or(AuthError::NonceNotFound)?;

        if self.clock.now_secs() > challenge.expires_at {
            return Err(AuthError::NonceExpired);
        }

        if challenge.nonce != supplied {
            return Err(AuthError::NonceMismatch);
        }

        Ok(())
    }
}

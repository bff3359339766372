//! Challenge (nonce) storage.
//!
//! Redis key pattern:
//! - `challenge:{address}` — outstanding challenge (JSON)
//!
//! `take` is an atomic get-and-delete in both backends. Whoever takes a
//! challenge owns it; a concurrent taker sees nothing.
//!
//! ## Security: Zeroizing Sensitive Data
//!
//! Challenge JSON read back from Redis is wrapped in `Zeroizing` so the
//! application's copy of the nonce is wiped once deserialized.

use super::StoreError;
use crate::auth::address::Address;
use crate::models::StoredChallenge;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Mutex;
use zeroize::Zeroizing;

/// Entries beyond this count trigger a sweep of expired challenges on `put`.
const MEMORY_SWEEP_THRESHOLD: usize = 10_000;

/// Extra Redis lifetime past `expires_at`, so late attempts still see the
/// entry and are reported as expired rather than missing.
const REDIS_EXPIRY_GRACE_SECS: u64 = 60;

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Store `challenge` for `address`, replacing any previous one.
    async fn put(
        &self,
        address: &Address,
        challenge: StoredChallenge,
        now: u64,
    ) -> Result<(), StoreError>;

    /// Remove and return the challenge for `address`, if any.
    async fn take(&self, address: &Address) -> Result<Option<StoredChallenge>, StoreError>;
}

/// Mutex-guarded map; a single lock covers every read-modify-write.
#[derive(Debug, Default)]
pub struct MemoryChallengeStore {
    entries: Mutex<HashMap<Address, StoredChallenge>>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every challenge that expired before `now`.
    pub fn purge_expired(&self, now: u64) -> usize {
        sweep_expired(&mut self.lock(), now)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Address, StoredChallenge>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn sweep_expired(entries: &mut HashMap<Address, StoredChallenge>, now: u64) -> usize {
    let before = entries.len();
    entries.retain(|_, c| c.expires_at >= now);
    before - entries.len()
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn put(
        &self,
        address: &Address,
        challenge: StoredChallenge,
        now: u64,
    ) -> Result<(), StoreError> {
        let mut entries = self.lock();
        if entries.len() >= MEMORY_SWEEP_THRESHOLD {
            let purged = sweep_expired(&mut entries, now);
            tracing::debug!(purged, "Swept expired challenges");
        }
        entries.insert(*address, challenge);
        Ok(())
    }

    async fn take(&self, address: &Address) -> Result<Option<StoredChallenge>, StoreError> {
        Ok(self.lock().remove(address))
    }
}

/// Redis-backed store shared by all service instances.
#[derive(Clone)]
pub struct RedisChallengeStore {
    client: redis::Client,
}

impl RedisChallengeStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

fn challenge_key(address: &Address) -> String {
    format!("challenge:{}", address)
}

#[async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn put(
        &self,
        address: &Address,
        challenge: StoredChallenge,
        now: u64,
    ) -> Result<(), StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;

        let json = Zeroizing::new(serde_json::to_string(&challenge)?);
        let ttl_secs = challenge.expires_at.saturating_sub(now) + REDIS_EXPIRY_GRACE_SECS;

        con.set_ex::<_, _, ()>(challenge_key(address), json.as_str(), ttl_secs)
            .await?;
        Ok(())
    }

    async fn take(&self, address: &Address) -> Result<Option<StoredChallenge>, StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;

        // Lua script for atomic GET + DEL
        let script = redis::Script::new(
            r"
            local val = redis.call('GET', KEYS[1])
            if val then
                redis.call('DEL', KEYS[1])
            end
            return val
            ",
        );

        let json: Option<String> = script
            .key(challenge_key(address))
            .invoke_async(&mut con)
            .await?;

        match json {
            Some(data) => {
                let data = Zeroizing::new(data);
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }
}

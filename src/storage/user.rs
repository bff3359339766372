//! User record operations.
//!
//! Redis key pattern:
//! - `user:{address}` — user data (JSON), no TTL
//!
//! A user record is created the first time an address logs in and looked
//! up on every later login. Creation is idempotent.

use super::StoreError;
use crate::auth::address::Address;
use crate::models::StoredUser;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Mutex;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Return the user for `address`, creating it with `created_at = now` if
    /// absent. The flag is true when this call created the record.
    async fn get_or_create(
        &self,
        address: &Address,
        now: u64,
    ) -> Result<(StoredUser, bool), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Address, StoredUser>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<StoredUser> {
        self.users
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_or_create(
        &self,
        address: &Address,
        now: u64,
    ) -> Result<(StoredUser, bool), StoreError> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(user) = users.get(address) {
            return Ok((user.clone(), false));
        }

        let user = StoredUser {
            address: address.to_string(),
            created_at: now,
        };
        users.insert(*address, user.clone());
        Ok((user, true))
    }
}

#[derive(Clone)]
pub struct RedisUserStore {
    client: redis::Client,
}

impl RedisUserStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserStore for RedisUserStore {
    async fn get_or_create(
        &self,
        address: &Address,
        now: u64,
    ) -> Result<(StoredUser, bool), StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let key = format!("user:{}", address);

        let candidate = StoredUser {
            address: address.to_string(),
            created_at: now,
        };
        let json = serde_json::to_string(&candidate)?;

        // SET NX: only the first login for an address writes the record
        let created: bool = con.set_nx(&key, json).await?;
        if created {
            return Ok((candidate, true));
        }

        let existing: Option<String> = con.get(&key).await?;
        match existing {
            Some(data) => Ok((serde_json::from_str(&data)?, false)),
            // Deleted between SET NX and GET; the candidate is still accurate
            None => Ok((candidate, false)),
        }
    }
}

//! Storage for outstanding challenges and user records.
//!
//! Each concern sits behind a trait with two backends:
//! - in-process memory, for single-instance deployments and tests
//! - Redis, so several service instances share challenges and users
//!
//! Redis values are JSON strings.

pub mod challenge;
pub mod user;

pub use challenge::{ChallengeStore, MemoryChallengeStore, RedisChallengeStore};
pub use user::{MemoryUserStore, RedisUserStore, UserStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

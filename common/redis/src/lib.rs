//! Thin async client abstraction over the Redis operations the resource
//! cache consumes: TTL'd reads and writes, an atomic set-if-absent used for
//! refill locking, delete, and expiry refresh.
//!
//! `RedisClient` is the production implementation; `MockRedisClient` is a
//! stateful in-memory stand-in for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod client;
mod mock;

pub use client::RedisClient;
pub use mock::{MockRedisCall, MockRedisClient, MockRedisOp};

// Re-export ErrorKind so consumers can construct CustomRedisError in tests.
pub use redis::ErrorKind as RedisErrorKind;

#[derive(Error, Debug, Clone)]
pub enum CustomRedisError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),
}

impl From<redis::RedisError> for CustomRedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CustomRedisError::Timeout
        } else {
            CustomRedisError::Redis(Arc::new(err))
        }
    }
}

impl CustomRedisError {
    /// Create a Redis error from an ErrorKind (primarily for testing)
    pub fn from_redis_kind(kind: redis::ErrorKind, description: &'static str) -> Self {
        CustomRedisError::Redis(Arc::new(redis::RedisError::from((kind, description))))
    }
}

/// The key-value operations the cache layer needs. Every operation can fail
/// with a connectivity error; a logical miss is `Ok(None)` / `Ok(false)`,
/// never an error.
#[async_trait]
pub trait Client: Send + Sync {
    /// Fetch a key, `None` when absent.
    async fn get(&self, k: String) -> Result<Option<String>, CustomRedisError>;

    /// Unconditional set with a TTL.
    async fn set_ex(&self, k: String, v: String, ttl: Duration) -> Result<(), CustomRedisError>;

    /// Atomic set-if-absent with a TTL. `true` means the key was created.
    async fn set_nx_ex(&self, k: String, v: String, ttl: Duration)
        -> Result<bool, CustomRedisError>;

    /// Delete a key, `true` if it existed.
    async fn del(&self, k: String) -> Result<bool, CustomRedisError>;

    /// Refresh a key's TTL, `false` if the key does not exist.
    async fn expire(&self, k: String, ttl: Duration) -> Result<bool, CustomRedisError>;

    /// Remaining TTL, `None` when the key is absent or has no expiry.
    async fn ttl(&self, k: String) -> Result<Option<Duration>, CustomRedisError>;
}

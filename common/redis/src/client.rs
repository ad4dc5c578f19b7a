use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};

use crate::{Client, CustomRedisError};

pub struct RedisClient {
    connection: MultiplexedConnection,
}

impl RedisClient {
    /// Create a new RedisClient with no command timeouts (blocks indefinitely).
    pub async fn new(addr: String) -> Result<RedisClient, CustomRedisError> {
        Self::with_timeouts(addr, None, None).await
    }

    /// Create a new RedisClient with optional response and connection
    /// timeouts. `None` means no timeout.
    ///
    /// # Errors
    /// Returns `CustomRedisError::InvalidConfiguration` if `Some(Duration::ZERO)`
    /// is passed - use `None` for no timeout instead.
    pub async fn with_timeouts(
        addr: String,
        response_timeout: Option<Duration>,
        connection_timeout: Option<Duration>,
    ) -> Result<RedisClient, CustomRedisError> {
        let client = redis::Client::open(addr)?;

        for (name, timeout) in [
            ("response", response_timeout),
            ("connection", connection_timeout),
        ] {
            if let Some(timeout) = timeout {
                if timeout.is_zero() {
                    return Err(CustomRedisError::InvalidConfiguration(format!(
                        "Redis {name} timeout cannot be Duration::ZERO - use None for no timeout"
                    )));
                }
            }
        }

        let mut config = redis::AsyncConnectionConfig::new();
        if let Some(timeout) = response_timeout {
            config = config.set_response_timeout(timeout);
        }
        if let Some(timeout) = connection_timeout {
            config = config.set_connection_timeout(timeout);
        }

        let connection = client
            .get_multiplexed_async_connection_with_config(&config)
            .await?;

        Ok(RedisClient { connection })
    }
}

#[async_trait]
impl Client for RedisClient {
    async fn get(&self, k: String) -> Result<Option<String>, CustomRedisError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(k).await?;
        Ok(value)
    }

    async fn set_ex(&self, k: String, v: String, ttl: Duration) -> Result<(), CustomRedisError> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(k, v, ttl.as_secs()).await?;
        Ok(())
    }

    async fn set_nx_ex(
        &self,
        k: String,
        v: String,
        ttl: Duration,
    ) -> Result<bool, CustomRedisError> {
        let mut conn = self.connection.clone();

        // Use SET with both NX and EX options
        let result: Result<Option<String>, RedisError> = redis::cmd("SET")
            .arg(&k)
            .arg(&v)
            .arg("EX")
            .arg(ttl.as_secs())
            .arg("NX")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(Some(_)) => Ok(true), // Key was set successfully
            Ok(None) => Ok(false),   // Key already existed
            Err(e) => Err(e.into()),
        }
    }

    async fn del(&self, k: String) -> Result<bool, CustomRedisError> {
        let mut conn = self.connection.clone();
        let removed: i64 = conn.del(k).await?;
        Ok(removed > 0)
    }

    async fn expire(&self, k: String, ttl: Duration) -> Result<bool, CustomRedisError> {
        let mut conn = self.connection.clone();
        let applied: bool = conn.expire(k, ttl.as_secs() as i64).await?;
        Ok(applied)
    }

    async fn ttl(&self, k: String) -> Result<Option<Duration>, CustomRedisError> {
        let mut conn = self.connection.clone();
        // TTL returns -2 for a missing key and -1 for a key without expiry.
        let seconds: i64 = conn.ttl(k).await?;
        if seconds < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(seconds as u64)))
        }
    }
}

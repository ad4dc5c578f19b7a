use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{Client, CustomRedisError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockRedisOp {
    Get,
    SetEx,
    SetNxEx,
    Del,
    Expire,
    Ttl,
}

#[derive(Debug, Clone)]
pub struct MockRedisCall {
    pub op: MockRedisOp,
    pub key: String,
}

#[derive(Clone)]
struct Entry {
    value: String,
    // `None` means no expiry. Tracked on the tokio clock so tests driving a
    // paused runtime control expiration deterministically.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if at <= Instant::now())
    }
}

/// In-memory `Client` implementation with real TTL semantics.
///
/// Clones share state, so one mock handed to several caches behaves like one
/// shared Redis. Flip `set_down(true)` to make every operation fail with a
/// connectivity error.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    down: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the server going away (or coming back).
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Seed a raw value, bypassing the call log. `ttl: None` means no expiry.
    pub fn seed(&self, key: &str, value: &str, ttl: Option<Duration>) {
        self.lock_entries().insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
    }

    /// Peek at a raw value, bypassing the call log.
    pub fn peek(&self, key: &str) -> Option<String> {
        let entries = self.lock_entries();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        self.lock_calls().clone()
    }

    pub fn call_count(&self, op: MockRedisOp) -> usize {
        self.lock_calls().iter().filter(|c| c.op == op).count()
    }

    pub fn clear_calls(&self) {
        self.lock_calls().clear();
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<MockRedisCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, op: MockRedisOp, key: &str) -> Result<(), CustomRedisError> {
        self.lock_calls().push(MockRedisCall {
            op,
            key: key.to_owned(),
        });
        if self.down.load(Ordering::SeqCst) {
            return Err(CustomRedisError::from_redis_kind(
                redis::ErrorKind::IoError,
                "mock redis is down",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Client for MockRedisClient {
    async fn get(&self, k: String) -> Result<Option<String>, CustomRedisError> {
        self.record(MockRedisOp::Get, &k)?;
        let mut entries = self.lock_entries();
        match entries.get(&k) {
            Some(entry) if entry.is_expired() => {
                entries.remove(&k);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, k: String, v: String, ttl: Duration) -> Result<(), CustomRedisError> {
        self.record(MockRedisOp::SetEx, &k)?;
        self.lock_entries().insert(
            k,
            Entry {
                value: v,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_nx_ex(
        &self,
        k: String,
        v: String,
        ttl: Duration,
    ) -> Result<bool, CustomRedisError> {
        self.record(MockRedisOp::SetNxEx, &k)?;
        let mut entries = self.lock_entries();
        let occupied = entries.get(&k).is_some_and(|entry| !entry.is_expired());
        if occupied {
            return Ok(false);
        }
        entries.insert(
            k,
            Entry {
                value: v,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn del(&self, k: String) -> Result<bool, CustomRedisError> {
        self.record(MockRedisOp::Del, &k)?;
        let mut entries = self.lock_entries();
        let existed = entries.remove(&k).is_some_and(|entry| !entry.is_expired());
        Ok(existed)
    }

    async fn expire(&self, k: String, ttl: Duration) -> Result<bool, CustomRedisError> {
        self.record(MockRedisOp::Expire, &k)?;
        let mut entries = self.lock_entries();
        match entries.get_mut(&k) {
            Some(entry) if !entry.is_expired() => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ttl(&self, k: String) -> Result<Option<Duration>, CustomRedisError> {
        self.record(MockRedisOp::Ttl, &k)?;
        let entries = self.lock_entries();
        let remaining = entries
            .get(&k)
            .filter(|entry| !entry.is_expired())
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()));
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_on_the_tokio_clock() {
        let client = MockRedisClient::new();
        client
            .set_ex("k".into(), "v".into(), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(client.get("k".into()).await.unwrap(), Some("v".into()));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(client.get("k".into()).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn set_nx_respects_live_entries_only() {
        let client = MockRedisClient::new();
        let ttl = Duration::from_secs(5);

        assert!(client
            .set_nx_ex("lock".into(), "a".into(), ttl)
            .await
            .unwrap());
        assert!(!client
            .set_nx_ex("lock".into(), "b".into(), ttl)
            .await
            .unwrap());

        // After the TTL lapses the lock is acquirable again.
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(client
            .set_nx_ex("lock".into(), "c".into(), ttl)
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn expire_refreshes_and_reports_missing_keys() {
        let client = MockRedisClient::new();
        assert!(!client
            .expire("nope".into(), Duration::from_secs(5))
            .await
            .unwrap());

        client
            .set_ex("k".into(), "v".into(), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(client
            .expire("k".into(), Duration::from_secs(60))
            .await
            .unwrap());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(client.get("k".into()).await.unwrap(), Some("v".into()));
        let remaining = client.ttl("k".into()).await.unwrap().unwrap();
        assert!(remaining <= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn down_mode_fails_every_operation() {
        let client = MockRedisClient::new();
        client.set_down(true);

        assert!(client.get("k".into()).await.is_err());
        assert!(client
            .set_ex("k".into(), "v".into(), Duration::from_secs(1))
            .await
            .is_err());
        assert!(client.del("k".into()).await.is_err());

        client.set_down(false);
        assert_eq!(client.get("k".into()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn call_log_tracks_operations() {
        let client = MockRedisClient::new();
        client.get("a".into()).await.unwrap();
        client.get("b".into()).await.unwrap();
        client.del("a".into()).await.unwrap();

        assert_eq!(client.call_count(MockRedisOp::Get), 2);
        assert_eq!(client.call_count(MockRedisOp::Del), 1);
        assert_eq!(client.get_calls()[0].key, "a");
    }
}

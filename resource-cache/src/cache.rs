use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use common_redis::{Client, CustomRedisError};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, warn};

use crate::config::{ResourceConfig, ResourceKeys};
use crate::envelope::{unix_now, Bundle, CacheRecord};
use crate::error::{CacheError, ConfigError};
use crate::lock::{Backoff, LockAttempt, LockWait};
use crate::metrics::{inc, STATUS_LOAD_ERROR, STATUS_REDIS_ERROR, STATUS_SUCCESS};
use crate::retry::RetryBudget;
use crate::snapshot::Snapshot;
use crate::source::Loader;

const LOCK_VALUE: &str = "locked";

/// The in-process snapshot: the last bundle copied out of Redis plus the
/// instant it stops being trusted. Born empty and already expired.
struct LocalState {
    data: Arc<Bundle>,
    expires_at: Instant,
}

/// Read-through cache of one named resource bundle, shared across worker
/// processes through Redis.
///
/// Reads (`get`, `require`, `contains`, `snapshot`) are pure in-process
/// lookups while the local snapshot is fresh. A stale snapshot triggers
/// `reload`: re-read Redis, and on a miss elect one refiller via a TTL'd
/// `SET NX` lock to call the source while competing workers back off. Source
/// and store failures degrade to serving stale data; only an exhausted retry
/// budget surfaces to callers.
pub struct ResourceCache<L> {
    name: String,
    keys: ResourceKeys,
    config: ResourceConfig,
    redis: Arc<dyn Client + Send + Sync>,
    loader: L,
    state: RwLock<LocalState>,
    /// Serializes reloads per instance and owns the retry budget. Waiters
    /// re-check freshness after acquiring so a finished reload is not
    /// repeated.
    reload_gate: Mutex<RetryBudget>,
}

impl<L: Loader> ResourceCache<L> {
    pub fn new(
        name: &str,
        redis: Arc<dyn Client + Send + Sync>,
        loader: L,
        config: ResourceConfig,
    ) -> Result<Self, ConfigError> {
        config.validate(name)?;
        let keys = ResourceKeys::derive(name, config.key_suffix.as_deref());
        Ok(ResourceCache {
            name: name.to_string(),
            keys,
            redis,
            loader,
            state: RwLock::new(LocalState {
                data: Arc::new(Bundle::new()),
                expires_at: Instant::now(),
            }),
            reload_gate: Mutex::new(RetryBudget::new(name, config.max_attempts)),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The Redis key this resource's bundle lives under. Instances deriving
    /// the same key are one logical resource.
    pub fn cache_key(&self) -> &str {
        &self.keys.cache
    }

    /// Look up one key, reloading first if the snapshot is stale.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.get(key).cloned())
    }

    /// Like `get`, but a missing key is `CacheError::KeyNotFound`.
    pub async fn require(&self, key: &str) -> Result<Value, CacheError> {
        let snapshot = self.snapshot().await?;
        snapshot.require(key).cloned()
    }

    pub async fn contains(&self, key: &str) -> Result<bool, CacheError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.contains(key))
    }

    /// A read-only view of the whole bundle, reloading first if stale.
    pub async fn snapshot(&self) -> Result<Snapshot, CacheError> {
        self.maybe_reload().await?;
        let state = self.read_state();
        Ok(Snapshot::new(self.name.clone(), Arc::clone(&state.data)))
    }

    /// Remaining TTL of the Redis entry, for diagnostics and sweeps.
    pub async fn store_ttl(&self) -> Result<Option<Duration>, CustomRedisError> {
        self.redis.ttl(self.keys.cache.clone()).await
    }

    /// Reload unconditionally: Redis first, then a lock-guarded refill from
    /// the source while Redis misses. Transient failures degrade to the
    /// current snapshot; an exhausted retry budget propagates.
    pub async fn reload(&self) -> Result<(), CacheError> {
        let mut budget = self.reload_gate.lock().await;
        self.reload_locked(&mut budget).await
    }

    async fn maybe_reload(&self) -> Result<(), CacheError> {
        if self.is_fresh() {
            return Ok(());
        }
        let mut budget = self.reload_gate.lock().await;
        // Whoever held the gate may have reloaded for us.
        if self.is_fresh() {
            return Ok(());
        }
        self.reload_locked(&mut budget).await
    }

    fn is_fresh(&self) -> bool {
        let state = self.read_state();
        if state.expires_at <= Instant::now() {
            return false;
        }
        !state.data.is_empty() || self.config.allow_empty_data
    }

    async fn reload_locked(&self, budget: &mut RetryBudget) -> Result<(), CacheError> {
        if self.reload_from_cache().await {
            return Ok(());
        }
        loop {
            if let Err(err) = self.refill_cache(budget).await {
                // The budget ran out. Keep serving whatever snapshot exists
                // for another reload_ttl before the next attempt cycle.
                self.prolong_local_expiration();
                return Err(err);
            }
            if self.reload_from_cache().await {
                return Ok(());
            }
            if self.config.max_attempts < 0 {
                self.prolong_local_expiration();
                error!(
                    resource = %self.name,
                    "reload failed; serving the local snapshot"
                );
                return Ok(());
            }
        }
    }

    /// Copy the Redis entry into the local snapshot. `false` on store error,
    /// absent key, or malformed payload - all equivalent to a miss.
    async fn reload_from_cache(&self) -> bool {
        match self.load_from_cache().await {
            Some(record) => {
                let mut state = self.write_state();
                state.data = Arc::new(record.data);
                state.expires_at = Instant::now() + self.config.reload_ttl;
                true
            }
            None => false,
        }
    }

    async fn load_from_cache(&self) -> Option<CacheRecord> {
        let payload = match self.redis.get(self.keys.cache.clone()).await {
            Ok(payload) => payload?,
            Err(err) => {
                self.process_cache_error("failed to load cache entry", &err);
                return None;
            }
        };
        match CacheRecord::decode(&payload) {
            Some(record) => Some(record),
            None => {
                warn!(resource = %self.name, "malformed cache entry, treating as a miss");
                None
            }
        }
    }

    /// The single-flight refill: take the distributed lock, call the source,
    /// write the result back with `cache_ttl`. The lock is released on every
    /// exit path; only budget exhaustion escapes, after release.
    async fn refill_cache(&self, budget: &mut RetryBudget) -> Result<(), CacheError> {
        match self.wait_for_refill_lock().await {
            LockWait::Unavailable => {
                // Store-unreachable feeds the same budget as source failures
                // so a bounded configuration still terminates.
                budget.countdown()
            }
            LockWait::Refreshed => Ok(()),
            LockWait::Held => {
                let outcome = self.load_and_store(budget).await;
                self.release_refill_lock().await;
                outcome
            }
        }
    }

    async fn load_and_store(&self, budget: &mut RetryBudget) -> Result<(), CacheError> {
        let data = match self.loader.load().await {
            Ok(data) => data,
            Err(err) => {
                error!(resource = %self.name, error = %err, "source load failed");
                return self.process_refill_error(budget).await;
            }
        };

        if data.is_empty() && !self.config.allow_empty_data {
            error!(resource = %self.name, "source returned an empty bundle");
            return self.process_refill_error(budget).await;
        }

        if self.save_to_cache(&data).await {
            budget.reset();
            Ok(())
        } else {
            // The write failed; the entry is still missing, so treat this
            // round like a failed load.
            budget.countdown()
        }
    }

    /// Degradation path for a failed load: keep the store warm, count the
    /// failure, spend budget.
    async fn process_refill_error(&self, budget: &mut RetryBudget) -> Result<(), CacheError> {
        self.prolong_cache_expiration().await;
        inc(&self.config.metric, &self.name, STATUS_LOAD_ERROR);
        budget.countdown()
    }

    async fn save_to_cache(&self, data: &Bundle) -> bool {
        let record = CacheRecord::new(data.clone());
        let payload = match record.encode() {
            Ok(payload) => payload,
            Err(err) => {
                error!(resource = %self.name, error = %err, "failed to encode cache entry");
                return false;
            }
        };
        match self
            .redis
            .set_ex(
                self.keys.cache.clone(),
                payload,
                self.config.effective_cache_ttl(),
            )
            .await
        {
            Ok(()) => {
                inc(&self.config.metric, &self.name, STATUS_SUCCESS);
                true
            }
            Err(err) => {
                self.process_cache_error("failed to save cache entry", &err);
                false
            }
        }
    }

    /// Push the Redis entry's expiry out so other workers keep reading the
    /// stale copy instead of stampeding a failing source. If no usable entry
    /// exists but the local snapshot has data, write the snapshot back:
    /// never leave the store colder than this process.
    async fn prolong_cache_expiration(&self) {
        if let Err(err) = self
            .redis
            .expire(self.keys.cache.clone(), self.config.effective_cache_ttl())
            .await
        {
            self.process_cache_error("failed to prolong cache expiration", &err);
        }

        if !self.reload_from_cache().await {
            let data = {
                let state = self.read_state();
                Arc::clone(&state.data)
            };
            if !data.is_empty() {
                self.save_to_cache(&data).await;
            }
        }
    }

    async fn wait_for_refill_lock(&self) -> LockWait {
        let started = unix_now();
        let mut backoff = Backoff::new(self.config.refill_lock_ttl);
        loop {
            match self.acquire_refill_lock().await {
                LockAttempt::Held => return LockWait::Held,
                LockAttempt::Unavailable => return LockWait::Unavailable,
                LockAttempt::Busy => {}
            }

            warn!(resource = %self.name, "refill already locked, backing off");
            // Let the lock owner finish.
            tokio::time::sleep(backoff.next_delay()).await;

            if self.is_refilled(started).await {
                return LockWait::Refreshed;
            }
        }
    }

    async fn acquire_refill_lock(&self) -> LockAttempt {
        match self
            .redis
            .set_nx_ex(
                self.keys.lock.clone(),
                LOCK_VALUE.to_string(),
                self.config.refill_lock_ttl,
            )
            .await
        {
            Ok(true) => LockAttempt::Held,
            Ok(false) => LockAttempt::Busy,
            Err(err) => {
                self.process_cache_error("failed to acquire refill lock", &err);
                LockAttempt::Unavailable
            }
        }
    }

    /// Best-effort unconditional delete; a leaked lock expires on its own
    /// after `refill_lock_ttl`.
    async fn release_refill_lock(&self) {
        if let Err(err) = self.redis.del(self.keys.lock.clone()).await {
            self.process_cache_error("failed to release refill lock", &err);
        }
    }

    /// Whether some worker wrote a fresh record after `since`.
    async fn is_refilled(&self, since: f64) -> bool {
        self.load_from_cache()
            .await
            .is_some_and(|record| record.timestamp > since)
    }

    fn prolong_local_expiration(&self) {
        let mut state = self.write_state();
        state.expires_at = Instant::now() + self.config.reload_ttl;
    }

    fn process_cache_error(&self, message: &'static str, err: &CustomRedisError) {
        error!(resource = %self.name, error = %err, "{message}");
        inc(&self.config.metric, &self.name, STATUS_REDIS_ERROR);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LocalState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LocalState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

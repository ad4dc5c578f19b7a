//! Blocking driver over the async reload engine, for worker processes that
//! are not running an event loop. The decision logic lives in one place
//! (`crate::ResourceCache`); this facade owns a current-thread runtime and
//! turns every suspension point into an actual thread park.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common_redis::{Client, CustomRedisError};
use serde_json::Value;
use tokio::runtime::Runtime;

use crate::config::ResourceConfig;
use crate::envelope::Bundle;
use crate::error::CacheError;
use crate::snapshot::Snapshot;

/// Synchronous flavor of [`crate::Loader`]: produce a fresh bundle or fail.
/// Runs on the caller's thread while it holds the refill lock.
pub trait Loader: Send + Sync {
    fn load(&self) -> anyhow::Result<Bundle>;
}

/// Adapts a blocking loader to the async engine. The engine only calls it
/// from `block_on`, so blocking the runtime thread here is fine.
struct SyncLoader<L>(L);

#[async_trait]
impl<L: Loader> crate::Loader for SyncLoader<L> {
    async fn load(&self) -> anyhow::Result<Bundle> {
        self.0.load()
    }
}

/// Blocking counterpart of [`crate::ResourceCache`]. Methods may be called
/// from multiple threads; reloads are serialized by the engine's gate.
pub struct ResourceCache<L: Loader> {
    runtime: Runtime,
    inner: crate::ResourceCache<SyncLoader<L>>,
}

impl<L: Loader> ResourceCache<L> {
    pub fn new(
        name: &str,
        redis: Arc<dyn Client + Send + Sync>,
        loader: L,
        config: ResourceConfig,
    ) -> Result<Self, CacheError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let inner = crate::ResourceCache::new(name, redis, SyncLoader(loader), config)?;
        Ok(ResourceCache { runtime, inner })
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn cache_key(&self) -> &str {
        self.inner.cache_key()
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.runtime.block_on(self.inner.get(key))
    }

    pub fn require(&self, key: &str) -> Result<Value, CacheError> {
        self.runtime.block_on(self.inner.require(key))
    }

    pub fn contains(&self, key: &str) -> Result<bool, CacheError> {
        self.runtime.block_on(self.inner.contains(key))
    }

    pub fn snapshot(&self) -> Result<Snapshot, CacheError> {
        self.runtime.block_on(self.inner.snapshot())
    }

    pub fn reload(&self) -> Result<(), CacheError> {
        self.runtime.block_on(self.inner.reload())
    }

    pub fn store_ttl(&self) -> Result<Option<Duration>, CustomRedisError> {
        self.runtime.block_on(self.inner.store_ttl())
    }
}

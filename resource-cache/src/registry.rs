use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::error;

use crate::cache::ResourceCache;
use crate::error::CacheError;
use crate::source::Loader;

/// What the registry needs from a cache instance: its identity and a way to
/// drive a reload.
#[async_trait]
pub trait CachedResource: Send + Sync {
    /// The derived Redis key; instances sharing it are one logical resource.
    fn cache_key(&self) -> &str;

    async fn reload(&self) -> Result<(), CacheError>;
}

#[async_trait]
impl<L: Loader> CachedResource for ResourceCache<L> {
    fn cache_key(&self) -> &str {
        ResourceCache::cache_key(self)
    }

    async fn reload(&self) -> Result<(), CacheError> {
        ResourceCache::reload(self).await
    }
}

/// Process-wide roster of cache instances, keyed by derived cache key so a
/// fleet-wide sweep touches each logical resource exactly once. Created and
/// passed around explicitly; there is no implicit global.
#[derive(Default)]
pub struct Registry {
    resources: Mutex<HashMap<String, Arc<dyn CachedResource>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance. A later registration for the same cache key
    /// replaces the earlier one.
    pub fn register(&self, resource: Arc<dyn CachedResource>) {
        self.lock()
            .insert(resource.cache_key().to_string(), resource);
    }

    pub fn all(&self) -> Vec<Arc<dyn CachedResource>> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The fleet-wide sweep: reload every registered resource once. Failures
    /// are logged and do not stop the sweep; returns how many reloads failed.
    pub async fn refresh_all(&self) -> usize {
        let mut failures = 0;
        for resource in self.all() {
            if let Err(err) = resource.reload().await {
                error!(
                    cache_key = resource.cache_key(),
                    error = %err,
                    "sweep reload failed"
                );
                failures += 1;
            }
        }
        failures
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn CachedResource>>> {
        match self.resources.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeResource {
        key: String,
        reloads: AtomicUsize,
        fail: bool,
    }

    impl FakeResource {
        fn new(key: &str, fail: bool) -> Arc<Self> {
            Arc::new(FakeResource {
                key: key.to_string(),
                reloads: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl CachedResource for FakeResource {
        fn cache_key(&self) -> &str {
            &self.key
        }

        async fn reload(&self) -> Result<(), CacheError> {
            self.reloads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CacheError::AttemptsExhausted {
                    resource: self.key.clone(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn duplicate_keys_collapse_to_one_entry() {
        let registry = Registry::new();
        let first = FakeResource::new("resource:rates", false);
        let second = FakeResource::new("resource:rates", false);
        registry.register(first.clone());
        registry.register(second.clone());

        assert_eq!(registry.len(), 1);
        registry.refresh_all().await;
        assert_eq!(first.reloads.load(Ordering::SeqCst), 0);
        assert_eq!(second.reloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sweep_continues_past_failures() {
        let registry = Registry::new();
        let bad = FakeResource::new("resource:bad", true);
        let good = FakeResource::new("resource:good", false);
        registry.register(bad.clone());
        registry.register(good.clone());

        let failures = registry.refresh_all().await;
        assert_eq!(failures, 1);
        assert_eq!(bad.reloads.load(Ordering::SeqCst), 1);
        assert_eq!(good.reloads.load(Ordering::SeqCst), 1);
    }
}

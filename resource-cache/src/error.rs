use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("resource name must not be empty")]
    EmptyName,
    #[error("cache_ttl ({cache_ttl:?}) must be at least reload_ttl ({reload_ttl:?})")]
    CacheTtlTooShort {
        cache_ttl: Duration,
        reload_ttl: Duration,
    },
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The consecutive source-failure budget ran out. This is the only
    /// runtime failure surfaced to callers; everything else degrades to
    /// stale data.
    #[error("load attempts exhausted for resource {resource}")]
    AttemptsExhausted { resource: String },

    #[error("key {key:?} not found in resource {resource}")]
    KeyNotFound { resource: String, key: String },

    /// The blocking facade could not build its runtime.
    #[error("failed to start blocking runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

//! Read-through, write-behind cache layer for whole "resource" bundles,
//! coordinated across worker processes through Redis.
//!
//! Each resource is one named key-to-value bundle, replaced atomically. Reads
//! are served from an in-process snapshot; when the snapshot goes stale the
//! engine re-reads Redis, and on a Redis miss elects exactly one worker (via
//! a TTL'd `SET NX` lock) to reload the expensive source while everybody else
//! backs off and picks up the refreshed entry. Failures degrade to serving
//! stale data, bounded by a per-resource retry budget.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use resource_cache::{Bundle, Loader, ResourceCache, ResourceConfig};
//!
//! struct CurrencyRates;
//!
//! #[async_trait::async_trait]
//! impl Loader for CurrencyRates {
//!     async fn load(&self) -> anyhow::Result<Bundle> {
//!         // hit the expensive source: a database scan, an external API...
//!         Ok(Bundle::new())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let redis = Arc::new(common_redis::RedisClient::new("redis://localhost:6379".into()).await?);
//! let cache = ResourceCache::new("currency-rates", redis, CurrencyRates, ResourceConfig::default())?;
//! let rate = cache.get("EUR").await?;
//! # Ok(())
//! # }
//! ```

pub mod blocking;
mod cache;
mod config;
mod envelope;
mod error;
mod lock;
mod metrics;
mod registry;
mod retry;
mod snapshot;
mod source;

pub use cache::ResourceCache;
pub use config::{ResourceConfig, DEFAULT_RELOAD_COUNTER};
pub use envelope::{Bundle, CacheRecord};
pub use error::{CacheError, ConfigError};
pub use registry::{CachedResource, Registry};
pub use snapshot::Snapshot;
pub use source::Loader;

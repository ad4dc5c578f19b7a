use std::time::Duration;

use crate::error::ConfigError;

/// Default counter name for reload outcome metrics.
pub const DEFAULT_RELOAD_COUNTER: &str = "resource_cache_reload_total";

/// Per-resource tuning, fixed at construction.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// How long the local snapshot is trusted before re-checking Redis.
    pub reload_ttl: Duration,
    /// How long the Redis entry itself lives. `None` defaults to
    /// `reload_ttl * 10`. The effective value must be >= `reload_ttl`.
    pub cache_ttl: Option<Duration>,
    /// Auto-expiry of the refill lock, bounding staleness if a refiller
    /// crashes while holding it.
    pub refill_lock_ttl: Duration,
    /// Consecutive source-failure budget. Negative means unbounded: the
    /// engine serves stale data forever and never raises.
    pub max_attempts: i32,
    /// Whether an empty bundle from the source is acceptable, as opposed to
    /// being treated as a failed load.
    pub allow_empty_data: bool,
    /// Counter name for reload outcome metrics.
    pub metric: String,
    /// Optional disambiguator appended to the derived Redis keys, for
    /// running several instances of the same resource type.
    pub key_suffix: Option<String>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            reload_ttl: Duration::from_secs(60),
            cache_ttl: None,
            refill_lock_ttl: Duration::from_secs(5),
            max_attempts: 3,
            allow_empty_data: false,
            metric: DEFAULT_RELOAD_COUNTER.to_string(),
            key_suffix: None,
        }
    }
}

impl ResourceConfig {
    pub(crate) fn effective_cache_ttl(&self) -> Duration {
        self.cache_ttl.unwrap_or(self.reload_ttl * 10)
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.effective_cache_ttl() < self.reload_ttl {
            return Err(ConfigError::CacheTtlTooShort {
                cache_ttl: self.effective_cache_ttl(),
                reload_ttl: self.reload_ttl,
            });
        }
        Ok(())
    }
}

/// The two Redis keys a resource name maps to. Two instances deriving the
/// same keys address the same logical resource.
#[derive(Debug, Clone)]
pub(crate) struct ResourceKeys {
    pub cache: String,
    pub lock: String,
}

impl ResourceKeys {
    pub fn derive(name: &str, suffix: Option<&str>) -> Self {
        let qualified = match suffix {
            Some(suffix) => format!("{name}:{suffix}"),
            None => name.to_string(),
        };
        ResourceKeys {
            cache: format!("resource:{qualified}"),
            lock: format!("lock:{qualified}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_ttl_is_ten_reload_ttls() {
        let config = ResourceConfig {
            reload_ttl: Duration::from_secs(30),
            ..Default::default()
        };
        assert_eq!(config.effective_cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn explicit_cache_ttl_wins() {
        let config = ResourceConfig {
            reload_ttl: Duration::from_secs(30),
            cache_ttl: Some(Duration::from_secs(45)),
            ..Default::default()
        };
        assert_eq!(config.effective_cache_ttl(), Duration::from_secs(45));
        assert!(config.validate("rates").is_ok());
    }

    #[test]
    fn cache_ttl_below_reload_ttl_is_rejected() {
        let config = ResourceConfig {
            reload_ttl: Duration::from_secs(60),
            cache_ttl: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        assert_eq!(
            config.validate("rates"),
            Err(ConfigError::CacheTtlTooShort {
                cache_ttl: Duration::from_secs(10),
                reload_ttl: Duration::from_secs(60),
            })
        );
    }

    #[test]
    fn empty_name_is_rejected() {
        let config = ResourceConfig::default();
        assert_eq!(config.validate(""), Err(ConfigError::EmptyName));
    }

    #[test]
    fn keys_include_optional_suffix() {
        let keys = ResourceKeys::derive("rates", None);
        assert_eq!(keys.cache, "resource:rates");
        assert_eq!(keys.lock, "lock:rates");

        let keys = ResourceKeys::derive("rates", Some("eu"));
        assert_eq!(keys.cache, "resource:rates:eu");
        assert_eq!(keys.lock, "lock:rates:eu");
    }
}

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One whole resource bundle: an opaque string-to-JSON mapping.
pub type Bundle = serde_json::Map<String, serde_json::Value>;

/// The payload stored in Redis: the bundle plus its creation time.
///
/// The wire shape is exactly `{"data": {...}, "timestamp": <float seconds>}`.
/// Anything else - a missing field, an extra field, a non-object - fails to
/// decode and is treated by callers as a cache miss, never as a crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheRecord {
    pub data: Bundle,
    /// Wall-clock seconds since the epoch at creation.
    pub timestamp: f64,
}

impl CacheRecord {
    pub fn new(data: Bundle) -> Self {
        CacheRecord {
            data,
            timestamp: unix_now(),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// `None` means the payload is malformed; the caller decides how loudly
    /// to log that.
    pub fn decode(payload: &str) -> Option<CacheRecord> {
        serde_json::from_str(payload).ok()
    }
}

/// Current wall-clock time as float seconds since the epoch, the unit the
/// stored `timestamp` field uses.
pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

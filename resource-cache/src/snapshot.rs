use std::sync::Arc;

use serde_json::Value;

use crate::envelope::Bundle;
use crate::error::CacheError;

/// A read-only view of a resource bundle at one point in time.
///
/// Cheap to clone (the data is shared, not copied) and deliberately exposes
/// no mutation entry points: the bundle is replaced wholesale by the reload
/// engine, never edited in place.
#[derive(Debug, Clone)]
pub struct Snapshot {
    resource: String,
    data: Arc<Bundle>,
}

impl Snapshot {
    pub(crate) fn new(resource: String, data: Arc<Bundle>) -> Self {
        Snapshot { resource, data }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Indexed lookup: a missing key is `CacheError::KeyNotFound`.
    pub fn require(&self, key: &str) -> Result<&Value, CacheError> {
        self.data.get(key).ok_or_else(|| CacheError::KeyNotFound {
            resource: self.resource.clone(),
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        let mut bundle = Bundle::new();
        bundle.insert("a".into(), json!(1));
        bundle.insert("b".into(), json!("two"));
        Snapshot::new("rates".into(), Arc::new(bundle))
    }

    #[test]
    fn lookup_and_iteration() {
        let snap = snapshot();
        assert_eq!(snap.get("a"), Some(&json!(1)));
        assert_eq!(snap.get("missing"), None);
        assert!(snap.contains("b"));
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.keys().count(), 2);
        assert_eq!(snap.iter().count(), 2);
    }

    #[test]
    fn require_reports_the_resource_and_key() {
        let err = snapshot().require("missing").unwrap_err();
        match err {
            CacheError::KeyNotFound { resource, key } => {
                assert_eq!(resource, "rates");
                assert_eq!(key, "missing");
            }
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn clones_share_data() {
        let snap = snapshot();
        let clone = snap.clone();
        assert!(Arc::ptr_eq(&snap.data, &clone.data));
    }
}

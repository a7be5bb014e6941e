//! Process-local resolution cache.
//!
//! Owned by a `TerminologyResolver` instance rather than module-level state,
//! so separate resolvers (and separate tests) never see each other's
//! entries. No automatic expiry; invalidation is explicit and, after any
//! write, total: descendant cache keys cannot be enumerated without a
//! reverse affiliation index, so the whole cache is dropped instead.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::types::{EntityLevel, ResolvedTerminology};

/// Cache key: one resolution target plus the key allow-list it was
/// restricted to. A restricted resolution and a full one are distinct
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionCacheKey {
    pub level: EntityLevel,
    pub entity_id: String,
    pub keys: Option<Vec<String>>,
}

impl ResolutionCacheKey {
    pub fn new(level: EntityLevel, entity_id: &str, keys: Option<&[String]>) -> Self {
        // Sort so the same allow-list in a different order hits the same slot.
        let keys = keys.map(|keys| {
            let mut keys = keys.to_vec();
            keys.sort();
            keys
        });
        Self {
            level,
            entity_id: entity_id.to_string(),
            keys,
        }
    }
}

#[derive(Default)]
pub struct ResolutionCache {
    inner: RwLock<HashMap<ResolutionCacheKey, ResolvedTerminology>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &ResolutionCacheKey) -> Option<ResolvedTerminology> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: ResolutionCacheKey, resolved: ResolvedTerminology) {
        self.inner.write().await.insert(key, resolved);
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_clear() {
        let cache = ResolutionCache::new();
        let key = ResolutionCacheKey::new(EntityLevel::Company, "c1", None);
        assert!(cache.get(&key).await.is_none());

        cache.insert(key.clone(), ResolvedTerminology::default()).await;
        assert!(cache.get(&key).await.is_some());
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_key_allow_list_order_is_normalized() {
        let a = ResolutionCacheKey::new(
            EntityLevel::Team,
            "t1",
            Some(&["b".to_string(), "a".to_string()]),
        );
        let b = ResolutionCacheKey::new(
            EntityLevel::Team,
            "t1",
            Some(&["a".to_string(), "b".to_string()]),
        );
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_restricted_and_full_resolutions_are_distinct() {
        let full = ResolutionCacheKey::new(EntityLevel::Team, "t1", None);
        let restricted =
            ResolutionCacheKey::new(EntityLevel::Team, "t1", Some(&["a".to_string()]));
        assert_ne!(full, restricted);
    }
}

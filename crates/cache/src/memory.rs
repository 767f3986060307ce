//! In-process cache backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::Result;
use crate::cache::Cache;

/// In-memory cache for single-process deployments and tests.
///
/// An expired entry is dropped when it is read, and every write sweeps the
/// other expired entries, so the map only holds live values plus whatever
/// expired since the last write.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, (String, Instant)>>>,
}

impl InMemoryCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops expired entries and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        before - entries.len()
    }

    /// Removes all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some((value, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => {}
            }
        }

        // Re-check under the write lock; a concurrent set may have refreshed it
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if let Some((value, expires_at)) = entries.get(key)
            && *expires_at > now
        {
            return Ok(Some(value.clone()));
        }
        entries.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheExt;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryCache::new();

        cache.set("k", "v".to_string(), TTL).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(cache.get("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_value() {
        let cache = InMemoryCache::new();

        cache.set("k", "old".to_string(), TTL).await.unwrap();
        cache.set("k", "new".to_string(), TTL).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".to_string(), TTL).await.unwrap();

        cache.remove("k").await.unwrap();
        cache.remove("missing").await.unwrap();

        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_sweep_expired_entries() {
        let cache = InMemoryCache::new();
        for key in ["a", "b", "c"] {
            cache
                .set(key, "v".to_string(), Duration::from_secs(5))
                .await
                .unwrap();
        }

        tokio::time::advance(Duration::from_secs(6)).await;
        cache.set("d", "v".to_string(), TTL).await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(cache.get("d").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = InMemoryCache::new();
        cache
            .set("short", "v".to_string(), Duration::from_secs(5))
            .await
            .unwrap();
        cache.set("long", "v".to_string(), TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = InMemoryCache::new();
        let value = serde_json::json!({"orderNumber": "20240101000-00001", "totalCents": 4000});

        cache.set_json("k", &value, TTL).await.unwrap();
        let read: Option<serde_json::Value> = cache.get_json("k").await.unwrap();

        assert_eq!(read, Some(value));
    }

    #[tokio::test]
    async fn test_get_json_rejects_garbage() {
        let cache = InMemoryCache::new();
        cache.set("k", "not json".to_string(), TTL).await.unwrap();

        let result: Result<Option<serde_json::Value>> = cache.get_json("k").await;

        assert!(matches!(result, Err(crate::CacheError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_remove_all() {
        let cache = InMemoryCache::new();
        cache.set("a", "1".to_string(), TTL).await.unwrap();
        cache.set("b", "2".to_string(), TTL).await.unwrap();
        cache.set("c", "3".to_string(), TTL).await.unwrap();

        cache
            .remove_all(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(cache.get("c").await.unwrap().is_some());
    }
}

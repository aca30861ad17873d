use crate::cache::{CacheStats, KvCache};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// In-memory fallback backed by moka with bounded capacity. Per-entry TTLs
/// are tracked as deadlines and checked on read, matching the Redis
/// `SET ... EX` behavior closely enough for a single-process deployment.
pub struct MemoryCacheService {
    entries: Cache<String, (String, Instant)>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCacheService {
    pub fn new(max_capacity: u64, max_ttl_seconds: u64) -> Self {
        let entries = Cache::builder()
            .time_to_live(Duration::from_secs(max_ttl_seconds))
            .max_capacity(max_capacity)
            .build();

        MemoryCacheService {
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl KvCache for MemoryCacheService {
    async fn get(&self, key: &str) -> Option<String> {
        match self.entries.get(key).await {
            Some((value, deadline)) => {
                if Instant::now() > deadline {
                    self.entries.invalidate(key).await;
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Memory cache expired: {}", key);
                    None
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Memory cache hit: {}", key);
                    Some(value)
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Memory cache miss: {}", key);
                None
            }
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) {
        let deadline = Instant::now() + Duration::from_secs(ttl_seconds);
        self.entries
            .insert(key.to_string(), (value.to_string(), deadline))
            .await;
    }

    async fn delete(&self, key: &str) -> bool {
        let existed = self.entries.get(key).await.is_some();
        self.entries.invalidate(key).await;
        existed
    }

    async fn get_stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses > 0 {
            (hits as f64 / (hits + misses) as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            hit_rate,
            connected: true,
        }
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let cache = MemoryCacheService::new(100, 3600);
        assert!(cache.get("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn roundtrip() {
        let cache = MemoryCacheService::new(100, 3600);
        cache.set_ex("key1", "value1", 60).await;
        assert_eq!(cache.get("key1").await.as_deref(), Some("value1"));
    }

    #[tokio::test]
    async fn overwrite_is_last_write_wins() {
        let cache = MemoryCacheService::new(100, 3600);
        cache.set_ex("key1", "old", 60).await;
        cache.set_ex("key1", "new", 60).await;
        assert_eq!(cache.get("key1").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let cache = MemoryCacheService::new(100, 3600);
        cache.set_ex("key1", "value1", 60).await;
        assert!(cache.delete("key1").await);
        assert!(!cache.delete("key1").await);
        assert!(cache.get("key1").await.is_none());
    }

    #[tokio::test]
    async fn per_entry_ttl_expiry() {
        let cache = MemoryCacheService::new(100, 3600);
        cache.set_ex("short", "v", 0).await;
        // Deadline is already in the past with a zero TTL
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.get("short").await.is_none());
    }

    #[tokio::test]
    async fn stats_tracking() {
        let cache = MemoryCacheService::new(100, 3600);
        cache.set_ex("key1", "v", 60).await;

        cache.get("missing").await;
        cache.get("key1").await;
        cache.get("key1").await;

        let stats = cache.get_stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 66.666).abs() < 1.0);
    }

    #[tokio::test]
    async fn backend_name_is_memory() {
        let cache = MemoryCacheService::new(100, 3600);
        assert_eq!(cache.backend_name(), "memory");
        assert!(cache.health_check().await);
    }
}

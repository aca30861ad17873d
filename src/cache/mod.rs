pub mod memory;
pub mod redis;

pub use memory::MemoryCacheService;
pub use redis::RedisCacheService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for the key-value cache backends shared by the spatial cell cache
/// and the per-user route cache. All methods take `&self` — no locking needed.
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    /// Batched get; backends with a native multi-get override this.
    async fn get_many(&self, keys: &[String]) -> Vec<Option<String>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await);
        }
        out
    }

    /// Set with a per-entry TTL in seconds. Last write wins.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64);
    /// Returns true when a value was actually removed.
    async fn delete(&self, key: &str) -> bool;
    async fn get_stats(&self) -> CacheStats;
    async fn health_check(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Key for one H3 cell's POI list at a given resolution.
pub fn cell_cache_key(resolution: u8, cell: &str) -> String {
    format!("h3:{}:{}", resolution, cell)
}

/// Key for a user's route-cache entry.
pub fn user_cache_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_key_carries_resolution() {
        let key = cell_cache_key(9, "8928308280fffff");
        assert_eq!(key, "h3:9:8928308280fffff");
    }

    #[test]
    fn user_key_prefix() {
        let key = user_cache_key("d3b0f9f2-3f3e-4c9a-a7b1-2f1a07f1c111");
        assert!(key.starts_with("user:"));
        assert!(key.ends_with("c111"));
    }
}

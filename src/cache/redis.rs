use crate::cache::{CacheStats, KvCache};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis-backed cache. All methods are `&self` — `ConnectionManager` is
/// `Arc`-based internally, so `.clone()` is a cheap atomic increment.
pub struct RedisCacheService {
    connection: ConnectionManager,
}

impl RedisCacheService {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!("Redis cache connection established");

        Ok(RedisCacheService { connection })
    }
}

#[async_trait]
impl KvCache for RedisCacheService {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<Option<String>> = conn.get(key).await;

        match result {
            Ok(value) => {
                if value.is_some() {
                    tracing::debug!("Cache hit: {}", key);
                } else {
                    tracing::debug!("Cache miss: {}", key);
                }
                value
            }
            Err(e) => {
                tracing::warn!("Redis error getting {}: {}", key, e);
                None
            }
        }
    }

    async fn get_many(&self, keys: &[String]) -> Vec<Option<String>> {
        if keys.is_empty() {
            return Vec::new();
        }

        let mut conn = self.connection.clone();
        let result: redis::RedisResult<Vec<Option<String>>> = conn.mget(keys).await;

        match result {
            Ok(values) if values.len() == keys.len() => values,
            Ok(_) | Err(_) => {
                tracing::warn!("Redis MGET degraded for {} keys", keys.len());
                vec![None; keys.len()]
            }
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<()> = conn.set_ex(key, value, ttl_seconds).await;

        if let Err(e) = result {
            tracing::warn!("Failed to cache {}: {}", key, e);
        } else {
            tracing::debug!("Cached {} with TTL {}s", key, ttl_seconds);
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<i64> = conn.del(key).await;

        match result {
            Ok(removed) => removed > 0,
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", key, e);
                false
            }
        }
    }

    async fn get_stats(&self) -> CacheStats {
        let mut conn = self.connection.clone();
        let info: redis::RedisResult<String> =
            redis::cmd("INFO").arg("stats").query_async(&mut conn).await;

        match info {
            Ok(info_str) => {
                let hits = parse_info_value(&info_str, "keyspace_hits");
                let misses = parse_info_value(&info_str, "keyspace_misses");
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
            Err(_) => CacheStats {
                hits: 0,
                misses: 0,
                hit_rate: 0.0,
                connected: false,
            },
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

fn parse_info_value(info: &str, key: &str) -> u64 {
    info.lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|val| val.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_info_extracts_counters() {
        let info = "keyspace_hits:42\r\nkeyspace_misses:7\r\n";
        assert_eq!(parse_info_value(info, "keyspace_hits"), 42);
        assert_eq!(parse_info_value(info, "keyspace_misses"), 7);
        assert_eq!(parse_info_value(info, "evicted_keys"), 0);
    }
}

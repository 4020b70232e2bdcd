use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{EtaError, EtaResult};
use crate::models::{Coordinate, PredictionResult};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// How often the in-process cache sweeps out expired entries.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Cache key built from the raw request coordinates.
///
/// Values are formatted with their shortest round-trip representation, so two
/// different inputs never share a key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_coordinates(current: Coordinate, dropoff: Coordinate) -> Self {
        Self(format!(
            "eta:{}:{}:{}:{}",
            current.lat, current.lng, dropoff.lat, dropoff.lng
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short-lived store of recent prediction results.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Expired and unknown keys both read as `None`.
    async fn get(&self, key: &CacheKey) -> EtaResult<Option<PredictionResult>>;

    /// Overwrites any existing entry under `key`.
    async fn put(&self, key: &CacheKey, value: &PredictionResult, ttl: Duration) -> EtaResult<()>;
}

/// Redis-backed cache; entries are JSON strings written with `SETEX`.
pub struct RedisResultCache {
    pool: Pool,
}

impl RedisResultCache {
    pub fn new(redis_url: &str) -> anyhow::Result<Self> {
        let cfg = RedisConfig::from_url(redis_url);
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ResultCache for RedisResultCache {
    async fn get(&self, key: &CacheKey) -> EtaResult<Option<PredictionResult>> {
        let mut conn = self.pool.get().await?;
        let cached: Option<String> = conn.get(key.as_str()).await?;

        match cached {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, value: &PredictionResult, ttl: Duration) -> EtaResult<()> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(value)?;
        // SETEX rejects a zero expiry.
        let secs = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key.as_str(), json, secs).await?;
        Ok(())
    }
}

struct MemoryEntry {
    value: PredictionResult,
    expires_at: Instant,
}

/// Process-local cache, used in tests and when no Redis is configured.
#[derive(Default)]
pub struct MemoryResultCache {
    entries: DashMap<CacheKey, MemoryEntry>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Sweeps expired entries every `every` on the current tokio runtime.
    ///
    /// The task holds a weak reference and stops once the cache is dropped.
    pub fn spawn_purger(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, remaining = cache.len(), "Purged expired cache entries");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &CacheKey) -> EtaResult<Option<PredictionResult>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone());

        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(hit)
    }

    async fn put(&self, key: &CacheKey, value: &PredictionResult, ttl: Duration) -> EtaResult<()> {
        self.entries.insert(
            key.clone(),
            MemoryEntry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

/// Cache that always fails; lets callers exercise the storage-outage path.
#[derive(Default)]
pub struct UnavailableCache;

#[async_trait]
impl ResultCache for UnavailableCache {
    async fn get(&self, _key: &CacheKey) -> EtaResult<Option<PredictionResult>> {
        Err(EtaError::Storage("cache unavailable".to_string()))
    }

    async fn put(&self, _key: &CacheKey, _value: &PredictionResult, _ttl: Duration) -> EtaResult<()> {
        Err(EtaError::Storage("cache unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = CacheKey::from_coordinates(
            Coordinate::new(14.5547, 121.0244),
            Coordinate::new(14.5176, 121.0509),
        );
        assert_eq!(key.as_str(), "eta:14.5547:121.0244:14.5176:121.0509");
    }

    #[test]
    fn test_key_distinguishes_close_values() {
        let a = CacheKey::from_coordinates(Coordinate::new(14.5, 121.0), Coordinate::new(14.6, 121.0));
        let b = CacheKey::from_coordinates(
            Coordinate::new(14.500000000000002, 121.0),
            Coordinate::new(14.6, 121.0),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_is_order_sensitive() {
        let p = Coordinate::new(14.5, 121.0);
        let q = Coordinate::new(14.6, 121.1);
        assert_ne!(CacheKey::from_coordinates(p, q), CacheKey::from_coordinates(q, p));
    }

    #[tokio::test]
    async fn test_memory_put_get_overwrite() {
        let cache = MemoryResultCache::new();
        let key = CacheKey("k".to_string());
        let first = PredictionResult::new(10.0, 4.0, "on the way, arriving shortly");
        let second = PredictionResult::new(20.0, 8.0, "delivery in progress");

        cache.put(&key, &first, DEFAULT_TTL).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(first));

        cache.put(&key, &second, DEFAULT_TTL).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unavailable_cache_fails_both_ways() {
        let cache = UnavailableCache;
        let key = CacheKey("k".to_string());
        let value = PredictionResult::new(3.0, 1.0, "nearby, preparing for arrival");

        assert!(matches!(tokio_test::block_on(cache.get(&key)), Err(EtaError::Storage(_))));
        assert!(matches!(
            tokio_test::block_on(cache.put(&key, &value, DEFAULT_TTL)),
            Err(EtaError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_zero_ttl_is_expired() {
        let cache = MemoryResultCache::new();
        let key = CacheKey("k".to_string());
        let value = PredictionResult::new(1.0, 0.0, "arriving very soon");
        cache.put(&key, &value, Duration::ZERO).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), None);
        assert!(cache.is_empty());
    }
}

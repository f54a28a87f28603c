//! The two-tier cache fronting `ListingStore` (spec §4.E).
//!
//! L1 is a process-local `moka` cache (60s TTL, bounded capacity, lock-free
//! reads). L2 is a pluggable `DistributedCache` — in production backed by
//! Redis, in tests an in-memory fake — so the coherence invariants in
//! spec §8 can be exercised without a live Redis server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::sync::Cache as MokaCache;
use parking_lot::Mutex;
use rand::Rng;

use crate::error::AppError;
use crate::listing::codec;
use crate::metrics::names;
use crate::models::Listing;

pub fn cache_key(world_id: i32, item_id: i32) -> String {
    format!("listing4:{world_id}:{item_id}")
}

/// The L2 backing store's capability surface. Production uses Redis;
/// tests use `InMemoryCache`.
#[async_trait]
pub trait DistributedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Redis-backed `DistributedCache`, using a pooled `ConnectionManager` so a
/// single clone can be shared across the process (spec §4.E tier 2).
pub struct RedisCache {
    manager: redis::aio::ConnectionManager,
    read_replica_count: u32,
}

impl RedisCache {
    pub fn new(manager: redis::aio::ConnectionManager, read_replica_count: u32) -> Self {
        Self {
            manager,
            read_replica_count,
        }
    }

    /// `PreferReplica` with probability `1/(1+R)`; in this deployment shape
    /// there is one logical endpoint, so the distinction is a
    /// latency characteristic exercised only under test, not a different
    /// code path (see SPEC_FULL.md §4.E).
    fn draw_prefer_replica(&self) -> bool {
        let probability = 1.0 / (1.0 + self.read_replica_count as f64);
        rand::thread_rng().gen_bool(probability.clamp(0.0, 1.0))
    }
}

#[async_trait]
impl DistributedCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let _prefer_replica = self.draw_prefer_replica();

        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(AppError::from)
    }
}

struct InMemoryEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process fake used by tests in place of a live Redis server.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, InMemoryEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AppError> {
        self.entries.lock().insert(
            key.to_string(),
            InMemoryEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Fronts a `DistributedCache` with a process-local `moka` tier. Owns the
/// read/probe/invalidate protocol from spec §4.E; the relational fallback
/// lives in `ListingStore`, which is the only caller of this type.
pub struct TwoTierCache {
    l1: MokaCache<String, Vec<Listing>>,
    l2: Arc<dyn DistributedCache>,
    l2_ttl: Duration,
    l2_probe_timeout: Duration,
}

impl TwoTierCache {
    pub fn new(
        l1_ttl: Duration,
        l1_capacity: u64,
        l2: Arc<dyn DistributedCache>,
        l2_ttl: Duration,
        l2_probe_timeout: Duration,
    ) -> Self {
        let l1 = MokaCache::builder()
            .time_to_live(l1_ttl)
            .max_capacity(l1_capacity)
            .build();

        Self {
            l1,
            l2,
            l2_ttl,
            l2_probe_timeout,
        }
    }

    /// Probes L1 then L2. Any L2 failure or timeout is treated as a miss —
    /// never surfaced as an error (spec §4.E failure semantics).
    pub async fn get(&self, key: &str) -> Option<Vec<Listing>> {
        if let Some(hit) = self.l1.get(key) {
            metrics::counter!(names::CACHE_L1_HITS_TOTAL).increment(1);
            return Some(hit);
        }

        let probe = tokio::time::timeout(self.l2_probe_timeout, self.l2.get(key)).await;
        match probe {
            Ok(Ok(Some(bytes))) => match codec::decode(&bytes) {
                Ok(listings) => {
                    metrics::counter!(names::CACHE_L2_HITS_TOTAL).increment(1);
                    self.l1.insert(key.to_string(), listings.clone());
                    Some(listings)
                }
                Err(err) => {
                    tracing::warn!(error = %err, key, "cache value failed to decode, treating as miss");
                    metrics::counter!(names::CACHE_MISSES_TOTAL).increment(1);
                    None
                }
            },
            Ok(Ok(None)) => {
                metrics::counter!(names::CACHE_MISSES_TOTAL).increment(1);
                None
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, key, "cache.miss (l2 error)");
                metrics::counter!(names::CACHE_MISSES_TOTAL).increment(1);
                None
            }
            Err(_) => {
                tracing::warn!(key, timeout_ms = self.l2_probe_timeout.as_millis() as u64, "cache.timeout");
                metrics::counter!("cache.timeout").increment(1);
                metrics::counter!(names::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Populates both tiers after a relational-store fetch. L2 write is
    /// fire-and-forget per spec §4.E.
    pub fn populate(&self, key: &str, listings: Vec<Listing>) {
        self.l1.insert(key.to_string(), listings.clone());

        let l2 = self.l2.clone();
        let ttl = self.l2_ttl;
        let key = key.to_string();
        tokio::spawn(async move {
            if let Ok(encoded) = codec::encode(&listings) {
                if let Err(err) = l2.set(&key, encoded, ttl).await {
                    tracing::warn!(error = %err, key, "fire-and-forget cache populate failed");
                }
            }
        });
    }

    /// Invalidates both tiers. L1 is removed synchronously (so the writer's
    /// own next read misses L1 and falls through), L2 deletion is
    /// fire-and-forget.
    pub fn invalidate(&self, key: &str) {
        self.l1.invalidate(key);

        let l2 = self.l2.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            if let Err(err) = l2.delete(&key).await {
                tracing::warn!(error = %err, key, "fire-and-forget cache invalidate failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_listing(id: &str, price: i64) -> Listing {
        Listing {
            listing_id: id.to_string(),
            item_id: 5057,
            world_id: 23,
            hq: false,
            on_mannequin: false,
            materia: vec![],
            unit_price: price,
            quantity: 1,
            dye_id: 0,
            creator_id: String::new(),
            creator_name: String::new(),
            last_review_time: Utc::now(),
            retainer_id: "r1".to_string(),
            retainer_name: "Mannequin".to_string(),
            retainer_city_id: 1,
            seller_id: "s1".to_string(),
            uploaded_at: Utc::now(),
            source: "test".to_string(),
        }
    }

    fn fixture_cache() -> TwoTierCache {
        TwoTierCache::new(
            Duration::from_secs(60),
            1000,
            Arc::new(InMemoryCache::new()),
            Duration::from_secs(600),
            Duration::from_secs(1),
        )
    }

    /// `DistributedCache` that sleeps past any reasonable probe timeout
    /// before answering, simulating a stalled replica.
    struct SlowCache {
        delay: Duration,
    }

    #[async_trait]
    impl DistributedCache for SlowCache {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
            tokio::time::sleep(self.delay).await;
            Ok(Some(codec::encode(&[sample_listing(key, 1)]).unwrap()))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), AppError> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn miss_then_populate_then_l1_hit() {
        let cache = fixture_cache();
        let key = cache_key(23, 5057);

        assert!(cache.get(&key).await.is_none());

        let listings = vec![sample_listing("A", 100)];
        cache.populate(&key, listings.clone());

        assert_eq!(cache.get(&key).await, Some(listings));
    }

    #[tokio::test]
    async fn invalidate_clears_l1_immediately() {
        let cache = fixture_cache();
        let key = cache_key(23, 5057);
        cache.populate(&key, vec![sample_listing("A", 100)]);
        assert!(cache.get(&key).await.is_some());

        cache.invalidate(&key);
        assert!(cache.l1.get(&key).is_none());
    }

    #[tokio::test]
    async fn l2_hit_repopulates_l1() {
        let cache = fixture_cache();
        let key = cache_key(23, 5057);
        let listings = vec![sample_listing("A", 100)];
        let encoded = codec::encode(&listings).unwrap();
        cache.l2.set(&key, encoded, Duration::from_secs(600)).await.unwrap();

        assert!(cache.l1.get(&key).is_none());
        let hit = cache.get(&key).await;
        assert_eq!(hit, Some(listings));
        assert!(cache.l1.get(&key).is_some());
    }

    #[tokio::test]
    async fn l2_timeout_is_treated_as_miss_and_bounded_by_probe_timeout() {
        let cache = TwoTierCache::new(
            Duration::from_secs(60),
            1000,
            Arc::new(SlowCache { delay: Duration::from_secs(2) }),
            Duration::from_secs(600),
            Duration::from_millis(200),
        );
        let key = cache_key(23, 5057);

        let started = Instant::now();
        let hit = cache.get(&key).await;
        let elapsed = started.elapsed();

        assert!(hit.is_none(), "a stalled L2 probe must be treated as a miss");
        assert!(
            elapsed < Duration::from_millis(1500),
            "get() should return once the probe timeout elapses, not wait for the full L2 delay: {elapsed:?}"
        );
    }
}

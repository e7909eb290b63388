use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;

use super::CacheStore;
use crate::error::CacheResult;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    ttl: Duration,
}

/// Expires every value after the TTL it was written with; a rewrite restarts
/// the clock.
struct WrittenTtl;

impl Expiry<String, StoredValue> for WrittenTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache store backed by moka.
///
/// Used when no Redis URL is configured (single-instance deployments and
/// tests). Each process has its own copy, so it is only "shared" between the
/// requests of one server.
#[derive(Clone)]
pub struct MemoryCacheStore {
    cache: Cache<String, StoredValue>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(WrittenTtl)
            .build();
        Self { cache }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get_multi(&self, keys: &[&str]) -> CacheResult<HashMap<String, Vec<u8>>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.cache.get(*key).await {
                found.insert(key.to_string(), value.bytes);
            }
        }
        Ok(found)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.cache
            .insert(key.to_string(), StoredValue { bytes: value, ttl })
            .await;
        Ok(())
    }

    async fn set_multi(&self, items: Vec<(String, Vec<u8>)>, ttl: Duration) -> CacheResult<()> {
        for (key, bytes) in items {
            self.cache.insert(key, StoredValue { bytes, ttl }).await;
        }
        Ok(())
    }

    async fn delete_multi(&self, keys: &[&str]) -> CacheResult<()> {
        for key in keys {
            self.cache.invalidate(*key).await;
        }
        Ok(())
    }
}

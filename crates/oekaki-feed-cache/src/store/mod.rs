//! Shared key/value cache backends
//!
//! A `CacheStore` offers per-key TTLs and batch get/set/delete, nothing more:
//! no transactions and no compare-and-swap. Absent keys are simply missing
//! from `get_multi` results.

mod memory;
mod redis_store;

pub use self::memory::MemoryCacheStore;
pub use self::redis_store::RedisCacheStore;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch several keys at once. Only present keys appear in the result.
    async fn get_multi(&self, keys: &[&str]) -> CacheResult<HashMap<String, Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Set several keys sharing one TTL
    async fn set_multi(&self, items: Vec<(String, Vec<u8>)>, ttl: Duration) -> CacheResult<()>;

    async fn delete_multi(&self, keys: &[&str]) -> CacheResult<()>;

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut found = self.get_multi(&[key]).await?;
        Ok(found.remove(key))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.delete_multi(&[key]).await
    }
}

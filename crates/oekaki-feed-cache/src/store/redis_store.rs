use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};
use tracing::{debug, info};

use super::CacheStore;
use crate::error::{CacheError, CacheResult};

/// Redis-backed cache store shared by every server instance.
///
/// Each command is bounded by `op_timeout`; a timeout is reported as a
/// backend error like any other Redis failure.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCacheStore {
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> CacheResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Backend(format!("invalid REDIS_URL: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Backend(format!("failed to connect to Redis: {e}")))?;
        info!(timeout_ms = op_timeout.as_millis() as u64, "Connected to Redis cache");
        Ok(Self { conn, op_timeout })
    }

    async fn run<T>(
        &self,
        op: &'static str,
        command: impl Future<Output = RedisResult<T>>,
    ) -> CacheResult<T> {
        match tokio::time::timeout(self.op_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::Backend(format!("{op} failed: {e}"))),
            Err(_) => Err(CacheError::Backend(format!(
                "{op} timed out after {}ms",
                self.op_timeout.as_millis()
            ))),
        }
    }
}

/// Redis rejects an `EX` of zero
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get_multi(&self, keys: &[&str]) -> CacheResult<HashMap<String, Vec<u8>>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.conn.clone();
        let values: Vec<Option<Vec<u8>>> = self
            .run("MGET", redis::cmd("MGET").arg(keys).query_async(&mut conn))
            .await?;

        let found: HashMap<String, Vec<u8>> = keys
            .iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect();
        debug!(requested = keys.len(), found = found.len(), "Cache MGET");
        Ok(found)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        self.run(
            "SET",
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs(ttl))
                .query_async::<_, ()>(&mut conn),
        )
        .await?;
        debug!(key = %key, ttl = ttl_secs(ttl), "Cache set");
        Ok(())
    }

    async fn set_multi(&self, items: Vec<(String, Vec<u8>)>, ttl: Duration) -> CacheResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let count = items.len();
        let mut pipe = redis::pipe();
        for (key, value) in items {
            pipe.cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs(ttl))
                .ignore();
        }

        let mut conn = self.conn.clone();
        self.run("pipeline SET", pipe.query_async::<_, ()>(&mut conn))
            .await?;
        debug!(count, "Cache pipeline set");
        Ok(())
    }

    async fn delete_multi(&self, keys: &[&str]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        self.run(
            "DEL",
            redis::cmd("DEL").arg(keys).query_async::<_, ()>(&mut conn),
        )
        .await?;
        debug!(count = keys.len(), "Cache delete");
        Ok(())
    }
}

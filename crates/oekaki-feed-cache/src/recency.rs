use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use oekaki_db::{Picture, PictureStore};
use tracing::{debug, warn};

use crate::entry::{TagCacheEntry, ENTRY_TTL, MARKER_TTL, STALE_AFTER};
use crate::error::CacheResult;
use crate::keys::{affected_buckets, TagCacheKeys, ALL_TAGS};
use crate::store::CacheStore;

/// Marker payload; only the key's existence matters
const MARKER_VALUE: u8 = 0;

#[derive(Debug, Clone)]
pub struct RecencyConfig {
    /// Entries at least this old are refreshed on the next read
    pub stale_after: Duration,
    pub entry_ttl: Duration,
    pub marker_ttl: Duration,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            stale_after: STALE_AFTER,
            entry_ttl: ENTRY_TTL,
            marker_ttl: MARKER_TTL,
        }
    }
}

/// What a read found in the shared cache for one bucket
#[derive(Default)]
struct Lookup {
    cached: Vec<Picture>,
    stale: bool,
    /// The stale marker was present, whether or not an entry was
    marked: bool,
}

/// Recency cache over the picture store, partitioned by tag.
///
/// Holds no in-process state besides its handles: every request reads and
/// writes the shared cache directly and concurrent refreshes of one bucket
/// simply race (last writer wins).
#[derive(Clone)]
pub struct RecencyCache {
    store: Arc<dyn CacheStore>,
    pictures: Arc<dyn PictureStore>,
    config: RecencyConfig,
}

impl RecencyCache {
    pub fn new(store: Arc<dyn CacheStore>, pictures: Arc<dyn PictureStore>) -> Self {
        Self::with_config(store, pictures, RecencyConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn CacheStore>,
        pictures: Arc<dyn PictureStore>,
        config: RecencyConfig,
    ) -> Self {
        Self {
            store,
            pictures,
            config,
        }
    }

    /// Get up to `count` of the newest pictures for `tag`, newest first.
    ///
    /// The empty tag selects every tag. Cache failures degrade to reading the
    /// picture store; only a picture store failure or an entry that cannot be
    /// encoded is returned as an error.
    pub async fn fetch(&self, tag: &str, count: usize) -> CacheResult<Vec<Picture>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let keys = TagCacheKeys::for_tag(tag);
        let now = Utc::now();
        let lookup = self.lookup(&keys, now).await;

        if !lookup.cached.is_empty() && !lookup.stale {
            debug!(tag = %tag, cached = lookup.cached.len(), "Feed cache hit");
            let mut pictures = lookup.cached;
            pictures.truncate(count);
            return Ok(pictures);
        }

        let end_at = lookup.cached.first().map(|p| p.posted_at);
        let fresh = self.read_recent(tag, end_at, count).await?;
        debug!(
            tag = %tag,
            end_at = ?end_at,
            fresh = fresh.len(),
            cached = lookup.cached.len(),
            "Refreshing feed cache"
        );

        let entry = TagCacheEntry::new(now, merge_recent(fresh, lookup.cached, count));
        let encoded = entry.encode()?;

        match self
            .store
            .set(&keys.entry_key, encoded, self.config.entry_ttl)
            .await
        {
            Ok(()) if lookup.marked => {
                if let Err(e) = self.store.delete(&keys.expire_key).await {
                    warn!(tag = %tag, error = %e, "Failed to clear feed cache stale marker");
                }
            }
            Ok(()) => {}
            Err(e) => {
                warn!(tag = %tag, error = %e, "Failed to store feed cache entry");
            }
        }

        Ok(entry.pictures)
    }

    /// Mark the buckets a new picture with `tag` belongs to as stale.
    ///
    /// Call only after the picture has been committed to the store. Failures
    /// are logged: the staleness window still bounds how long the write stays
    /// hidden.
    pub async fn mark_stale(&self, tag: &str) {
        let markers = affected_buckets(tag)
            .into_iter()
            .map(|bucket| (TagCacheKeys::for_tag(bucket).expire_key, vec![MARKER_VALUE]))
            .collect();

        match self.store.set_multi(markers, self.config.marker_ttl).await {
            Ok(()) => debug!(tag = %tag, "Marked feed cache stale"),
            Err(e) => warn!(tag = %tag, error = %e, "Failed to mark feed cache stale"),
        }
    }

    /// Drop the cached lists a deleted picture with `tag` may appear in.
    ///
    /// A stale marker alone is not enough after a delete: the refresh merges
    /// the old list back in and would keep the deleted picture.
    pub async fn drop_bucket(&self, tag: &str) {
        let entry_keys: Vec<String> = affected_buckets(tag)
            .into_iter()
            .map(|bucket| TagCacheKeys::for_tag(bucket).entry_key)
            .collect();
        let key_refs: Vec<&str> = entry_keys.iter().map(String::as_str).collect();

        if let Err(e) = self.store.delete_multi(&key_refs).await {
            warn!(tag = %tag, error = %e, "Failed to drop feed cache entries");
        }
        self.mark_stale(tag).await;
    }

    async fn lookup(&self, keys: &TagCacheKeys, now: DateTime<Utc>) -> Lookup {
        let found = match self
            .store
            .get_multi(&[keys.expire_key.as_str(), keys.entry_key.as_str()])
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(key = %keys.entry_key, error = %e, "Feed cache unavailable, reading from store");
                return Lookup::default();
            }
        };

        let marked = found.contains_key(&keys.expire_key);
        let Some(raw) = found.get(&keys.entry_key) else {
            debug!(key = %keys.entry_key, "Feed cache miss");
            return Lookup {
                marked,
                ..Lookup::default()
            };
        };

        match TagCacheEntry::decode(raw) {
            Ok(entry) => {
                let stale = marked || entry.is_stale_at(now, self.config.stale_after);
                Lookup {
                    cached: entry.pictures,
                    stale,
                    marked,
                }
            }
            Err(e) => {
                warn!(key = %keys.entry_key, error = %e, "Dropping undecodable feed cache entry");
                if let Err(e) = self.store.delete(&keys.entry_key).await {
                    warn!(key = %keys.entry_key, error = %e, "Failed to drop feed cache entry");
                }
                Lookup {
                    marked,
                    ..Lookup::default()
                }
            }
        }
    }

    async fn read_recent(
        &self,
        tag: &str,
        end_at: Option<DateTime<Utc>>,
        count: usize,
    ) -> CacheResult<Vec<Picture>> {
        let tag_filter = (tag != ALL_TAGS).then_some(tag);
        Ok(self.pictures.recent(tag_filter, end_at, count).await?)
    }
}

/// Merge freshly read pictures ahead of cached ones.
///
/// Keeps the first occurrence of each id and stops at `count`. Both inputs are
/// newest first and the fresh list only reaches back to the newest cached
/// picture, so the result stays newest first.
pub(crate) fn merge_recent(
    fresh: Vec<Picture>,
    cached: Vec<Picture>,
    count: usize,
) -> Vec<Picture> {
    let mut seen = HashSet::with_capacity(count);
    let mut merged = Vec::with_capacity(count);

    for picture in fresh.into_iter().chain(cached) {
        if merged.len() >= count {
            break;
        }
        if seen.insert(picture.id.clone()) {
            merged.push(picture);
        }
    }

    merged
}

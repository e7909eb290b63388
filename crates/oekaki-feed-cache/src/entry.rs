use std::time::Duration;

use chrono::{DateTime, Utc};
use oekaki_db::Picture;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Lifetime of a bucket entry in the shared cache
pub const ENTRY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifetime of a stale marker. Matches the entry TTL, so a marker never
/// outlives the entry it refers to by more than a day.
pub(crate) const MARKER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Age after which an entry is refreshed even without a marker
pub const STALE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Cached recency list for one tag bucket.
///
/// Always replaced wholesale; never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCacheEntry {
    pub captured_at: DateTime<Utc>,
    pub pictures: Vec<Picture>,
}

impl TagCacheEntry {
    pub fn new(captured_at: DateTime<Utc>, pictures: Vec<Picture>) -> Self {
        Self {
            captured_at,
            pictures,
        }
    }

    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(CacheError::Serialization)
    }

    pub fn decode(bytes: &[u8]) -> CacheResult<Self> {
        serde_json::from_slice(bytes).map_err(CacheError::Decode)
    }

    /// Whether the entry is at least `stale_after` old at `now`.
    ///
    /// An entry captured in the future (clock skew between servers) counts as
    /// fresh.
    pub fn is_stale_at(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        match (now - self.captured_at).to_std() {
            Ok(age) => age >= stale_after,
            Err(_) => false,
        }
    }
}

//! Tag-scoped recency cache for the picture feed
//!
//! Serves the newest pictures per tag from a shared key/value cache, falling
//! back to the durable store when the cached list is missing, corrupt, older
//! than the staleness window, or explicitly marked stale by a write. Fresh
//! rows are merged ahead of cached rows and deduplicated by id.

mod entry;
mod error;
mod keys;
mod recency;
pub mod store;

pub use entry::{TagCacheEntry, ENTRY_TTL, STALE_AFTER};
pub use error::{CacheError, CacheResult};
pub use keys::TagCacheKeys;
pub use recency::{RecencyCache, RecencyConfig};
pub use store::{CacheStore, MemoryCacheStore, RedisCacheStore};

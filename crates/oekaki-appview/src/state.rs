use std::sync::Arc;

use oekaki_db::PictureStore;
use oekaki_feed_cache::RecencyCache;

use crate::storage::BlobStore;

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    pub pictures: Arc<dyn PictureStore>,
    pub feed: RecencyCache,
    pub blobs: Arc<BlobStore>,
}

//! Cache error types

use oekaki_db::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// The shared cache could not be reached or rejected a command
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A stored entry could not be decoded
    #[error("Cache decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// A new entry could not be encoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The durable store failed while refreshing a bucket
    #[error("Picture query failed: {0}")]
    Query(#[from] DbError),
}

pub type CacheResult<T> = Result<T, CacheError>;

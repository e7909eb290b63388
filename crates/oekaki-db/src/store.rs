//! The durable store seam used by the feed cache and the HTTP layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use crate::error::DbError;
use crate::pictures;
use crate::types::{NewPicture, Picture};

/// Durable picture storage.
///
/// `recent` returns pictures strictly newest first. A `tag` of `None` spans
/// every tag; `end_at` bounds the scan to pictures posted at or after that
/// instant.
#[async_trait]
pub trait PictureStore: Send + Sync {
    /// Insert a picture and return its assigned id
    async fn insert(&self, picture: &NewPicture) -> Result<String, DbError>;

    async fn recent(
        &self,
        tag: Option<&str>,
        end_at: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Picture>, DbError>;

    async fn by_author(&self, author: &str, limit: usize) -> Result<Vec<Picture>, DbError>;

    async fn get(&self, id: &str) -> Result<Picture, DbError>;

    /// Delete a picture and return the removed record
    async fn delete(&self, id: &str) -> Result<Picture, DbError>;
}

/// PostgreSQL-backed picture store
#[derive(Clone)]
pub struct PgPictureStore {
    pool: PgPool,
}

impl PgPictureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl PictureStore for PgPictureStore {
    async fn insert(&self, picture: &NewPicture) -> Result<String, DbError> {
        let id = pictures::insert(&self.pool, picture).await?;
        debug!(id = %id, tag = %picture.tag, "Inserted picture");
        Ok(id)
    }

    async fn recent(
        &self,
        tag: Option<&str>,
        end_at: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Picture>, DbError> {
        let rows = pictures::get_recent(&self.pool, tag, end_at, sql_limit(limit)).await?;
        debug!(tag = ?tag, end_at = ?end_at, read = rows.len(), "Read recent pictures");
        Ok(rows)
    }

    async fn by_author(&self, author: &str, limit: usize) -> Result<Vec<Picture>, DbError> {
        Ok(pictures::get_by_author(&self.pool, author, sql_limit(limit)).await?)
    }

    async fn get(&self, id: &str) -> Result<Picture, DbError> {
        pictures::get(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<Picture, DbError> {
        pictures::delete(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_limit_saturates() {
        assert_eq!(sql_limit(100), 100);
        assert_eq!(sql_limit(usize::MAX), i64::MAX);
    }
}

//! In-process picture store.
//!
//! Used when no `DATABASE_URL` is configured and by tests. Posting times are
//! kept strictly increasing so feed ordering matches the database store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::DbError;
use crate::store::PictureStore;
use crate::types::{NewPicture, Picture};

#[derive(Default)]
pub struct MemoryPictureStore {
    // Kept in insertion order, which is also posted_at order
    pictures: RwLock<Vec<Picture>>,
}

impl MemoryPictureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_posted_at(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl PictureStore for MemoryPictureStore {
    async fn insert(&self, picture: &NewPicture) -> Result<String, DbError> {
        let mut pictures = self.pictures.write().await;
        let id = Uuid::new_v4().to_string();
        let posted_at = next_posted_at(pictures.last().map(|p| p.posted_at));

        pictures.push(Picture {
            id: id.clone(),
            name: picture.name.clone(),
            tag: picture.tag.clone(),
            answer: picture.answer.clone(),
            author: picture.author.clone(),
            signature_hash: picture.signature_hash.clone(),
            posted_at,
        });
        Ok(id)
    }

    async fn recent(
        &self,
        tag: Option<&str>,
        end_at: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Picture>, DbError> {
        let pictures = self.pictures.read().await;
        Ok(pictures
            .iter()
            .rev()
            .filter(|p| tag.is_none_or(|t| p.tag == t))
            .filter(|p| end_at.is_none_or(|end| p.posted_at >= end))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn by_author(&self, author: &str, limit: usize) -> Result<Vec<Picture>, DbError> {
        let pictures = self.pictures.read().await;
        Ok(pictures
            .iter()
            .rev()
            .filter(|p| p.author == author)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Picture, DbError> {
        let pictures = self.pictures.read().await;
        pictures
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<Picture, DbError> {
        let mut pictures = self.pictures.write().await;
        let index = pictures
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;
        Ok(pictures.remove(index))
    }
}

//! Picture posting, listing and deletion.
//!
//! Every write goes to the picture store first and only then signals the feed
//! cache, so a refresh triggered by the signal always sees the committed row.

use oekaki_db::{DbError, NewPicture, Picture};
use tracing::{info, warn};
use uuid::Uuid;

use crate::constants::{
    AUTHOR_FEED_LIMIT, FEED_LIMIT, MAX_ANSWER_LENGTH, MAX_AUTHOR_LENGTH, MAX_SIGNATURE_LENGTH,
    MAX_TAG_LENGTH, PICTURE_EXTENSION,
};
use crate::crypto::signature_hash;
use crate::error::AppError;
use crate::state::AppState;
use crate::validation::validate_max_length;

/// A picture submitted through the post form
#[derive(Debug, Default)]
pub struct Upload {
    pub data: Vec<u8>,
    pub tag: String,
    pub answer: String,
    pub author: String,
    pub signature: String,
}

impl Upload {
    fn validate(&self) -> Result<(), AppError> {
        validate_max_length(&self.tag, MAX_TAG_LENGTH, "tag")?;
        validate_max_length(&self.answer, MAX_ANSWER_LENGTH, "answer")?;
        validate_max_length(&self.author, MAX_AUTHOR_LENGTH, "author")?;
        validate_max_length(&self.signature, MAX_SIGNATURE_LENGTH, "signature")?;
        Ok(())
    }
}

/// Store the image, record the picture and mark its feed buckets stale.
pub async fn post_picture(state: &AppState, upload: Upload) -> Result<String, AppError> {
    upload.validate()?;

    let name = format!("{}.{PICTURE_EXTENSION}", Uuid::new_v4());
    state
        .blobs
        .save(&name, &upload.data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store picture {name}: {e}")))?;

    let inserted = state
        .pictures
        .insert(&NewPicture {
            name: name.clone(),
            tag: upload.tag.clone(),
            answer: upload.answer,
            author: upload.author,
            signature_hash: signature_hash(&upload.signature),
        })
        .await;

    let id = match inserted {
        Ok(id) => id,
        Err(e) => {
            if let Err(cleanup) = state.blobs.delete(&name).await {
                warn!(name = %name, error = %cleanup, "Failed to remove picture file after failed insert");
            }
            return Err(e.into());
        }
    };

    state.feed.mark_stale(&upload.tag).await;
    info!(id = %id, tag = %upload.tag, "Posted picture");
    Ok(id)
}

/// Newest pictures for `tag`, or for `author` when one is given.
///
/// `recent` is the id of the newest picture the client already has; it and
/// everything after it are left out of the tag feed.
pub async fn list_pictures(
    state: &AppState,
    tag: &str,
    recent: Option<&str>,
    author: Option<&str>,
) -> Result<Vec<Picture>, AppError> {
    if let Some(author) = author {
        return Ok(state.pictures.by_author(author, AUTHOR_FEED_LIMIT).await?);
    }

    let pictures = state.feed.fetch(tag, FEED_LIMIT).await?;
    Ok(match recent {
        Some(recent) => newer_than(pictures, recent),
        None => pictures,
    })
}

/// Keep the pictures listed before the one with id `recent`.
///
/// An unknown id keeps the whole list.
pub fn newer_than(mut pictures: Vec<Picture>, recent: &str) -> Vec<Picture> {
    if let Some(pos) = pictures.iter().position(|p| p.id == recent) {
        pictures.truncate(pos);
    }
    pictures
}

/// Delete a picture if `signature` matches the one it was posted with.
///
/// Every failure up to the record removal is reported as a bad request. Once
/// the record is gone the delete has succeeded; a leftover image file is only
/// logged.
pub async fn delete_picture(
    state: &AppState,
    id: &str,
    signature: &str,
) -> Result<Picture, AppError> {
    let picture = state.pictures.get(id).await.map_err(rejected)?;
    if picture.signature_hash != signature_hash(signature) {
        warn!(id = %id, "Rejected delete with mismatched signature");
        return Err(AppError::BadRequest("Signature does not match".into()));
    }

    let picture = state.pictures.delete(id).await.map_err(rejected)?;
    state.feed.drop_bucket(&picture.tag).await;

    if let Err(e) = state.blobs.delete(&picture.name).await {
        warn!(id = %id, name = %picture.name, error = %e, "Failed to delete picture file");
    }

    info!(id = %id, tag = %picture.tag, "Deleted picture");
    Ok(picture)
}

fn rejected(e: DbError) -> AppError {
    warn!(error = %e, "Delete rejected");
    AppError::BadRequest("Could not delete picture".into())
}

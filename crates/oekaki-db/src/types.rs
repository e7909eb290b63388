use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A posted picture as stored in the `pictures` table.
///
/// `id` and `posted_at` are assigned by the store on insert. The serde form is
/// complete (it is what the feed cache stores); API responses go through a
/// separate view that leaves out the author and the signature hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    pub id: String,
    /// Object name of the image bytes in the blob store
    pub name: String,
    pub tag: String,
    pub answer: String,
    pub author: String,
    pub signature_hash: String,
    pub posted_at: DateTime<Utc>,
}

/// Parameters for inserting a picture
#[derive(Debug, Clone, Default)]
pub struct NewPicture {
    pub name: String,
    pub tag: String,
    pub answer: String,
    pub author: String,
    pub signature_hash: String,
}

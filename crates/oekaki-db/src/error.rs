//! Error types for picture storage

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Picture not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

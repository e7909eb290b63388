use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use oekaki_db::DbError;
use oekaki_feed_cache::CacheError;
use serde_json::json;

/// Application error type that converts to HTTP responses
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
    Store(DbError),
    Cache(CacheError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Store(e) => {
                tracing::error!(error = %e, "Picture store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Cache(e) => {
                tracing::error!(error = %e, "Feed cache error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(_) => AppError::NotFound(e.to_string()),
            other => AppError::Store(other),
        }
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Query(db) => db.into(),
            other => AppError::Cache(other),
        }
    }
}

pub mod health;
pub mod pictures;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;

use crate::constants::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// API routes plus the stored images under `/images`
pub fn router(state: AppState) -> Router {
    let images = ServeDir::new(state.blobs.dir());

    Router::new()
        // Health
        .route("/health", get(health::health))
        // Pictures
        .route("/api/post", post(pictures::post_picture))
        .route("/api/list", get(pictures::list_pictures))
        .route("/api/picture", get(pictures::get_picture))
        .route("/api/delete", post(pictures::delete_picture))
        .nest_service("/images", images)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

mod config;
mod constants;
mod crypto;
mod error;
mod gallery;
mod routes;
mod state;
mod storage;
mod validation;

use std::sync::Arc;

use axum::http::{header, Method};
use oekaki_db::{MemoryPictureStore, PgPictureStore, PictureStore};
use oekaki_feed_cache::{
    CacheStore, MemoryCacheStore, RecencyCache, RecencyConfig, RedisCacheStore,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use config::Config;
use state::AppState;
use storage::BlobStore;

#[tokio::main]
async fn main() {
    init_logging();

    let config = Config::from_env();
    info!(port = config.port, "Starting oekaki-appview");

    let pictures: Arc<dyn PictureStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(20)
                .connect(url)
                .await
                .expect("Failed to connect to database");
            oekaki_db::migrate::migrate(&pool)
                .await
                .expect("Failed to run migrations");
            Arc::new(PgPictureStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, pictures are kept in memory");
            Arc::new(MemoryPictureStore::new())
        }
    };

    let cache_store: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisCacheStore::connect(url, config.cache_op_timeout)
                .await
                .expect("Failed to connect to Redis"),
        ),
        None => {
            info!("REDIS_URL not set, using in-process feed cache");
            Arc::new(MemoryCacheStore::new())
        }
    };

    let feed = RecencyCache::with_config(
        cache_store,
        pictures.clone(),
        RecencyConfig {
            stale_after: config.feed_stale_after,
            ..RecencyConfig::default()
        },
    );

    let blobs = BlobStore::new(config.blob_dir.clone());
    blobs
        .init()
        .await
        .expect("Failed to create picture directory");
    info!(blob_dir = %config.blob_dir.display(), "Serving pictures");

    let state = AppState {
        pictures,
        feed,
        blobs: Arc::new(blobs),
    };

    let app = routes::router(state).layer(cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("Failed to bind");

    info!(port = config.port, "Listening");

    axum::serve(listener, app).await.expect("Server failed");
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("oekaki_appview=info,oekaki_feed_cache=info"));

    // JSON for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

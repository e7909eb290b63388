use sqlx::PgPool;
use tracing::info;

use crate::error::DbError;

/// Apply the embedded `migrations/` directory to `pool`
pub async fn migrate(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::Database(sqlx::Error::from(e)))?;
    info!("Picture schema is up to date");
    Ok(())
}

use crate::types::{NewPicture, Picture};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::warn;

/// Advisory lock key serializing picture inserts
pub const INSERT_LOCK_KEY: i64 = 0x6f65_6b61_6b69;

/// Insert a picture, returning the id assigned by the database.
///
/// Inserts are serialized on an advisory lock held until commit, and each
/// `posted_at` is at least one microsecond past the newest existing row. Stamps
/// therefore follow commit order: a picture never becomes visible with a
/// timestamp older than one that was already readable.
pub async fn insert(pool: &PgPool, p: &NewPicture) -> Result<String, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(INSERT_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    let (id,): (String,) = sqlx::query_as(
        r#"
        INSERT INTO pictures (name, tag, answer, author, signature_hash, posted_at)
        VALUES (
            $1, $2, $3, $4, $5,
            GREATEST(
                clock_timestamp(),
                (SELECT max(posted_at) + interval '1 microsecond' FROM pictures)
            )
        )
        RETURNING id
        "#,
    )
    .bind(&p.name)
    .bind(&p.tag)
    .bind(&p.answer)
    .bind(&p.author)
    .bind(&p.signature_hash)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(id)
}

/// Get the most recent pictures, newest first.
///
/// `tag` of `None` spans all tags. When `end_at` is set the scan stops at that
/// instant (inclusive), so only pictures posted at or after it are returned.
pub async fn get_recent(
    pool: &PgPool,
    tag: Option<&str>,
    end_at: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<Picture>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(
        r#"
        SELECT id, name, tag, answer, author, signature_hash, posted_at
        FROM pictures
        WHERE TRUE
        "#,
    );

    if let Some(tag) = tag {
        qb.push(" AND tag = ");
        qb.push_bind(tag.to_string());
    }

    if let Some(end_at) = end_at {
        qb.push(" AND posted_at >= ");
        qb.push_bind(end_at);
    }

    qb.push(" ORDER BY posted_at DESC, id DESC LIMIT ");
    qb.push_bind(limit);

    let rows = qb.build().fetch_all(pool).await?;
    Ok(decode_rows(&rows))
}

/// Get the most recent pictures posted by an author
pub async fn get_by_author(
    pool: &PgPool,
    author: &str,
    limit: i64,
) -> Result<Vec<Picture>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, tag, answer, author, signature_hash, posted_at
        FROM pictures
        WHERE author = $1
        ORDER BY posted_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(author)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(decode_rows(&rows))
}

/// Get a single picture by id
pub async fn get(pool: &PgPool, id: &str) -> Result<Option<Picture>, sqlx::Error> {
    sqlx::query_as::<_, Picture>(
        r#"
        SELECT id, name, tag, answer, author, signature_hash, posted_at
        FROM pictures
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Delete a picture, returning the deleted row
pub async fn delete(pool: &PgPool, id: &str) -> Result<Option<Picture>, sqlx::Error> {
    sqlx::query_as::<_, Picture>(
        r#"
        DELETE FROM pictures
        WHERE id = $1
        RETURNING id, name, tag, answer, author, signature_hash, posted_at
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Decode rows one by one; a malformed row is logged and skipped
fn decode_rows(rows: &[PgRow]) -> Vec<Picture> {
    rows.iter()
        .filter_map(|row| match Picture::from_row(row) {
            Ok(picture) => Some(picture),
            Err(e) => {
                warn!(error = %e, "Skipping malformed picture row");
                None
            }
        })
        .collect()
}

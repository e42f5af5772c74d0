//! `social_posts` operations.
//!
//! A post row is unique per `(article_id, platform)`; every write is an upsert
//! on that pair.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{SocialPostRow, SocialPostUpsert},
};

const POST_COLUMNS: &str = "id, article_id, platform, content, media_urls, hashtags, post_id, post_url, \
     short_url, status, error_message, retry_count, scheduled_for, posted_at, created_at";

pub async fn get_post(pool: &PgPool, id: Uuid) -> Result<SocialPostRow, DbError> {
    let sql = format!("SELECT {POST_COLUMNS} FROM social_posts WHERE id = $1");
    sqlx::query_as::<_, SocialPostRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn find_by_short_code(pool: &PgPool, code: &str) -> Result<Option<SocialPostRow>, DbError> {
    let sql = format!("SELECT {POST_COLUMNS} FROM social_posts WHERE short_url = $1");
    let row = sqlx::query_as::<_, SocialPostRow>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Platforms that already have a post row for `article_id`, whatever its status.
pub async fn posted_platforms(pool: &PgPool, article_id: Uuid) -> Result<Vec<String>, DbError> {
    let platforms: Vec<String> =
        sqlx::query_scalar("SELECT platform FROM social_posts WHERE article_id = $1")
            .bind(article_id)
            .fetch_all(pool)
            .await?;
    Ok(platforms)
}

/// Whether a post or an open queue item on `platform` already holds `at`.
pub async fn slot_taken(pool: &PgPool, platform: &str, at: DateTime<Utc>) -> Result<bool, DbError> {
    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (SELECT 1 FROM social_posts WHERE platform = $1 AND scheduled_for = $2)
            OR EXISTS (SELECT 1 FROM social_post_queue
                       WHERE platform = $1 AND scheduled_for = $2
                         AND status IN ('pending', 'processing'))
        "#,
    )
    .bind(platform)
    .bind(at)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

/// Make sure a post row exists for `(article_id, platform)` and give it a
/// fresh short code. Returns the row id.
pub async fn reserve_short_code(
    pool: &PgPool,
    article_id: Uuid,
    platform: &str,
    short_code: &str,
) -> Result<Uuid, DbError> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO social_posts (id, article_id, platform, status, short_url)
        VALUES ($1, $2, $3, 'pending', $4)
        ON CONFLICT (article_id, platform) DO UPDATE SET short_url = EXCLUDED.short_url
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(article_id)
    .bind(platform)
    .bind(short_code)
    .fetch_one(pool)
    .await
    .map_err(DbError::from_write)?;
    Ok(id)
}

/// Insert or update the post row for `(article_id, platform)`.
///
/// The stored short code and retry counter are preserved.
pub async fn upsert_post(pool: &PgPool, post: &SocialPostUpsert) -> Result<SocialPostRow, DbError> {
    let sql = format!(
        r#"
        INSERT INTO social_posts
            (id, article_id, platform, content, media_urls, hashtags, post_id, post_url,
             status, error_message, posted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (article_id, platform) DO UPDATE
        SET content = EXCLUDED.content,
            media_urls = EXCLUDED.media_urls,
            hashtags = EXCLUDED.hashtags,
            post_id = EXCLUDED.post_id,
            post_url = EXCLUDED.post_url,
            status = EXCLUDED.status,
            error_message = EXCLUDED.error_message,
            posted_at = EXCLUDED.posted_at
        RETURNING {POST_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, SocialPostRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(post.article_id)
        .bind(&post.platform)
        .bind(&post.content)
        .bind(&post.media_urls)
        .bind(&post.hashtags)
        .bind(&post.post_id)
        .bind(&post.post_url)
        .bind(&post.status)
        .bind(&post.error_message)
        .bind(post.posted_at)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

/// Flag a post for another attempt and bump its retry counter.
pub async fn mark_retry(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE social_posts SET status = 'pending', retry_count = retry_count + 1 WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Posts published on a platform since `since` that carry a platform post id.
pub async fn recent_posted(pool: &PgPool, since: DateTime<Utc>) -> Result<Vec<SocialPostRow>, DbError> {
    let sql = format!(
        "SELECT {POST_COLUMNS} FROM social_posts \
         WHERE status = 'posted' AND post_id IS NOT NULL AND posted_at >= $1 \
         ORDER BY posted_at DESC"
    );
    let rows = sqlx::query_as::<_, SocialPostRow>(&sql)
        .bind(since)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

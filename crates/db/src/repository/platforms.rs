//! `social_platforms` operations.

use chrono::Utc;
use sqlx::PgPool;

use crate::{DbError, models::PlatformRow};

const PLATFORM_COLUMNS: &str = "platform, is_active, credentials, last_posted_at, created_at";

pub async fn list_platforms(pool: &PgPool) -> Result<Vec<PlatformRow>, DbError> {
    let sql = format!("SELECT {PLATFORM_COLUMNS} FROM social_platforms ORDER BY platform ASC");
    let rows = sqlx::query_as::<_, PlatformRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Names of the platforms currently switched on.
pub async fn active_platform_names(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let names: Vec<String> =
        sqlx::query_scalar("SELECT platform FROM social_platforms WHERE is_active = TRUE")
            .fetch_all(pool)
            .await?;
    Ok(names)
}

/// The row for `platform`, but only when it is active.
pub async fn get_active_platform(pool: &PgPool, platform: &str) -> Result<Option<PlatformRow>, DbError> {
    let sql = format!(
        "SELECT {PLATFORM_COLUMNS} FROM social_platforms WHERE platform = $1 AND is_active = TRUE"
    );
    let row = sqlx::query_as::<_, PlatformRow>(&sql)
        .bind(platform)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Insert or update a platform row. `None` fields keep their stored value.
pub async fn upsert_platform(
    pool: &PgPool,
    platform: &str,
    credentials: Option<serde_json::Value>,
    is_active: Option<bool>,
) -> Result<PlatformRow, DbError> {
    let sql = format!(
        r#"
        INSERT INTO social_platforms (platform, is_active, credentials)
        VALUES ($1, COALESCE($2, FALSE), $3)
        ON CONFLICT (platform) DO UPDATE
        SET is_active   = COALESCE($2, social_platforms.is_active),
            credentials = COALESCE($3, social_platforms.credentials)
        RETURNING {PLATFORM_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, PlatformRow>(&sql)
        .bind(platform)
        .bind(is_active)
        .bind(credentials)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn touch_last_posted(pool: &PgPool, platform: &str) -> Result<(), DbError> {
    sqlx::query("UPDATE social_platforms SET last_posted_at = $1 WHERE platform = $2")
        .bind(Utc::now())
        .bind(platform)
        .execute(pool)
        .await?;
    Ok(())
}

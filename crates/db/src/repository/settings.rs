//! `site_settings` key/value access.

use chrono::Utc;
use sqlx::PgPool;

use crate::{DbError, models::SettingRow};

pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<SettingRow>, DbError> {
    let row = sqlx::query_as::<_, SettingRow>(
        "SELECT key, value, updated_at FROM site_settings WHERE key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn upsert_setting(pool: &PgPool, key: &str, value: &str) -> Result<SettingRow, DbError> {
    let row = sqlx::query_as::<_, SettingRow>(
        r#"
        INSERT INTO site_settings (key, value, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
        RETURNING key, value, updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

//! Click tracking, engagement snapshots and the analytics roll-up.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{EngagementRow, NewClick, PlatformAnalyticsRow},
};

pub async fn record_click(pool: &PgPool, click: &NewClick) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO social_clicks
            (id, social_post_id, short_code, ip_address, user_agent, referrer, device_type, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(click.social_post_id)
    .bind(&click.short_code)
    .bind(&click.ip_address)
    .bind(&click.user_agent)
    .bind(&click.referrer)
    .bind(&click.device_type)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_engagement(pool: &PgPool, row: &EngagementRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO social_engagement
            (social_post_id, likes, shares, comments, views, reach, engagement_rate, synced_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (social_post_id) DO UPDATE
        SET likes = EXCLUDED.likes,
            shares = EXCLUDED.shares,
            comments = EXCLUDED.comments,
            views = EXCLUDED.views,
            reach = EXCLUDED.reach,
            engagement_rate = EXCLUDED.engagement_rate,
            synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(row.social_post_id)
    .bind(row.likes)
    .bind(row.shares)
    .bind(row.comments)
    .bind(row.views)
    .bind(row.reach)
    .bind(row.engagement_rate)
    .bind(row.synced_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Post counts, clicks and engagement totals per platform.
pub async fn platform_analytics(pool: &PgPool) -> Result<Vec<PlatformAnalyticsRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformAnalyticsRow>(
        r#"
        SELECT p.platform,
               COUNT(*) FILTER (WHERE p.status = 'posted')  AS posted,
               COUNT(*) FILTER (WHERE p.status = 'pending') AS pending,
               COUNT(*) FILTER (WHERE p.status = 'failed')  AS failed,
               COALESCE(SUM(c.clicks), 0)::BIGINT           AS clicks,
               COALESCE(SUM(e.likes), 0)::BIGINT            AS likes,
               COALESCE(SUM(e.shares), 0)::BIGINT           AS shares,
               COALESCE(SUM(e.comments), 0)::BIGINT         AS comments
        FROM social_posts p
        LEFT JOIN (
            SELECT social_post_id, COUNT(*) AS clicks
            FROM social_clicks
            GROUP BY social_post_id
        ) c ON c.social_post_id = p.id
        LEFT JOIN social_engagement e ON e.social_post_id = p.id
        GROUP BY p.platform
        ORDER BY p.platform ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

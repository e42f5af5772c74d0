//! Posting schedule slots.

use sqlx::PgPool;

use crate::{DbError, models::ScheduleRow};

/// Active slots for `platform`, in day-of-week / hour / minute order.
pub async fn active_slots(pool: &PgPool, platform: &str) -> Result<Vec<ScheduleRow>, DbError> {
    let rows = sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT id, platform, day_of_week, hour, minute, timezone, is_active
        FROM social_schedule
        WHERE platform = $1 AND is_active = TRUE
        ORDER BY day_of_week ASC, hour ASC, minute ASC
        "#,
    )
    .bind(platform)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

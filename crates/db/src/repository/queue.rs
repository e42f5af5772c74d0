//! Social post queue repository functions.
//!
//! The queue is backed by the `social_post_queue` table.  Workers read the
//! due set, then claim each row with a conditional `UPDATE` so two workers
//! never process the same item.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{QueueItemRow, StatusCountRow},
};

const QUEUE_COLUMNS: &str = "id, article_id, platform, priority, status, attempts, scheduled_for, \
     error_message, created_at, processed_at";

/// Enqueue a new item in `pending` status.
pub async fn enqueue(
    pool: &PgPool,
    article_id: Uuid,
    platform: &str,
    priority: i32,
    scheduled_for: DateTime<Utc>,
) -> Result<QueueItemRow, DbError> {
    let sql = format!(
        r#"
        INSERT INTO social_post_queue
            (id, article_id, platform, priority, status, attempts, scheduled_for, created_at)
        VALUES ($1, $2, $3, $4, 'pending', 0, $5, $6)
        RETURNING {QUEUE_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, QueueItemRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(article_id)
        .bind(platform)
        .bind(priority)
        .bind(scheduled_for)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Pending items whose `scheduled_for` has arrived, highest priority first,
/// then oldest schedule first.
pub async fn due_items(pool: &PgPool, now: DateTime<Utc>, limit: i64) -> Result<Vec<QueueItemRow>, DbError> {
    let sql = format!(
        r#"
        SELECT {QUEUE_COLUMNS}
        FROM social_post_queue
        WHERE status = 'pending' AND scheduled_for <= $1
        ORDER BY priority DESC, scheduled_for ASC
        LIMIT $2
        "#
    );

    let rows = sqlx::query_as::<_, QueueItemRow>(&sql)
        .bind(now)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Move a `pending` item to `processing` and bump its attempt counter.
///
/// Returns `None` when the item is no longer pending (claimed elsewhere).
pub async fn claim(pool: &PgPool, id: Uuid) -> Result<Option<QueueItemRow>, DbError> {
    let sql = format!(
        r#"
        UPDATE social_post_queue
        SET status = 'processing', attempts = attempts + 1
        WHERE id = $1 AND status = 'pending'
        RETURNING {QUEUE_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, QueueItemRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Put an item back to `pending` for a later attempt.
pub async fn reschedule(
    pool: &PgPool,
    id: Uuid,
    scheduled_for: DateTime<Utc>,
    error_message: &str,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE social_post_queue
        SET status = 'pending', scheduled_for = $1, error_message = $2
        WHERE id = $3
        "#,
    )
    .bind(scheduled_for)
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn complete(pool: &PgPool, id: Uuid, processed_at: DateTime<Utc>) -> Result<(), DbError> {
    sqlx::query("UPDATE social_post_queue SET status = 'completed', processed_at = $1 WHERE id = $2")
        .bind(processed_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn fail(pool: &PgPool, id: Uuid, error_message: &str) -> Result<(), DbError> {
    sqlx::query("UPDATE social_post_queue SET status = 'failed', error_message = $1 WHERE id = $2")
        .bind(error_message)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Number of queue rows per status.
pub async fn status_counts(pool: &PgPool) -> Result<Vec<StatusCountRow>, DbError> {
    let rows = sqlx::query_as::<_, StatusCountRow>(
        "SELECT status, COUNT(*) AS count FROM social_post_queue GROUP BY status",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Delete completed items processed before `cutoff`. Returns the number removed.
pub async fn delete_completed_before(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM social_post_queue WHERE status = 'completed' AND processed_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

//! The storage seam for the queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{NewQueueItem, QueueError, QueueItem, QueueStats};

/// Persistence operations the queue processor relies on.
///
/// Implemented over Postgres in the `automation` crate and in memory by
/// [`InMemoryQueueStore`](crate::InMemoryQueueStore).
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Insert a `pending` item with zero attempts.
    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem, QueueError>;

    /// Pending items due at `now`: priority descending, then schedule ascending.
    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueItem>, QueueError>;

    /// `pending → processing`, incrementing `attempts`.
    ///
    /// `None` when the item is no longer pending.
    async fn claim(&self, id: Uuid) -> Result<Option<QueueItem>, QueueError>;

    /// `processing → pending`, due again at `at`.
    async fn reschedule(&self, id: Uuid, at: DateTime<Utc>, error: &str) -> Result<(), QueueError>;

    /// `processing → completed`.
    async fn complete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), QueueError>;

    /// `processing → failed`.
    async fn fail(&self, id: Uuid, error: &str) -> Result<(), QueueError>;

    /// Counts per status. `is_processing` is left false for the caller to fill.
    async fn stats(&self) -> Result<QueueStats, QueueError>;

    /// Delete completed items processed before `cutoff`; returns how many.
    async fn cleanup(&self, cutoff: DateTime<Utc>) -> Result<u64, QueueError>;
}

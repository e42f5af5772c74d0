//! In-memory `QueueStore`, used by tests and single-process dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{NewQueueItem, QueueError, QueueItem, QueueStats, QueueStatus, QueueStore};

#[derive(Default)]
pub struct InMemoryQueueStore {
    items: Mutex<HashMap<Uuid, QueueItem>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<QueueItem> {
        self.items.lock().await.get(&id).cloned()
    }

    /// Snapshot of every item, oldest first.
    pub async fn all(&self) -> Vec<QueueItem> {
        let mut items: Vec<QueueItem> = self.items.lock().await.values().cloned().collect();
        items.sort_by_key(|i| i.created_at);
        items
    }

    async fn update<F>(&self, id: Uuid, f: F) -> Result<(), QueueError>
    where
        F: FnOnce(&mut QueueItem) + Send,
    {
        let mut items = self.items.lock().await;
        let item = items.get_mut(&id).ok_or(QueueError::NotFound(id))?;
        f(item);
        Ok(())
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem, QueueError> {
        let now = Utc::now();
        let queued = QueueItem {
            id: Uuid::new_v4(),
            article_id: item.article_id,
            platform: item.platform,
            priority: item.priority,
            status: QueueStatus::Pending,
            attempts: 0,
            scheduled_for: item.scheduled_for.unwrap_or(now),
            error_message: None,
            created_at: now,
            processed_at: None,
        };
        self.items.lock().await.insert(queued.id, queued.clone());
        Ok(queued)
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueItem>, QueueError> {
        let items = self.items.lock().await;
        let mut due: Vec<QueueItem> = items
            .values()
            .filter(|i| i.status == QueueStatus::Pending && i.scheduled_for <= now)
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.scheduled_for.cmp(&b.scheduled_for))
        });
        due.truncate(limit);
        Ok(due)
    }

    async fn claim(&self, id: Uuid) -> Result<Option<QueueItem>, QueueError> {
        let mut items = self.items.lock().await;
        match items.get_mut(&id) {
            Some(item) if item.status == QueueStatus::Pending => {
                item.status = QueueStatus::Processing;
                item.attempts += 1;
                Ok(Some(item.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn reschedule(&self, id: Uuid, at: DateTime<Utc>, error: &str) -> Result<(), QueueError> {
        let error = error.to_owned();
        self.update(id, move |item| {
            item.status = QueueStatus::Pending;
            item.scheduled_for = at;
            item.error_message = Some(error);
        })
        .await
    }

    async fn complete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), QueueError> {
        self.update(id, move |item| {
            item.status = QueueStatus::Completed;
            item.processed_at = Some(at);
        })
        .await
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), QueueError> {
        let error = error.to_owned();
        self.update(id, move |item| {
            item.status = QueueStatus::Failed;
            item.error_message = Some(error);
        })
        .await
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        let mut stats = QueueStats::default();
        for item in self.items.lock().await.values() {
            stats.add(item.status, 1);
        }
        Ok(stats)
    }

    async fn cleanup(&self, cutoff: DateTime<Utc>) -> Result<u64, QueueError> {
        let mut items = self.items.lock().await;
        let before = items.len();
        items.retain(|_, i| {
            !(i.status == QueueStatus::Completed && i.processed_at.is_some_and(|at| at < cutoff))
        });
        Ok((before - items.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use publishers::Platform;

    #[tokio::test]
    async fn due_orders_by_priority_then_schedule() {
        let store = InMemoryQueueStore::new();
        let now = Utc::now();
        let article = Uuid::new_v4();

        let low = store
            .enqueue(NewQueueItem::new(article, Platform::Reddit).at(now - Duration::minutes(30)))
            .await
            .unwrap();
        let high_late = store
            .enqueue(NewQueueItem::new(article, Platform::Twitter).priority(10).at(now - Duration::minutes(1)))
            .await
            .unwrap();
        let high_early = store
            .enqueue(NewQueueItem::new(article, Platform::Facebook).priority(10).at(now - Duration::minutes(5)))
            .await
            .unwrap();
        store
            .enqueue(NewQueueItem::new(article, Platform::Instagram).priority(99).at(now + Duration::hours(1)))
            .await
            .unwrap();

        let due: Vec<Uuid> = store.due(now, 10).await.unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(due, vec![high_early.id, high_late.id, low.id]);

        assert_eq!(store.due(now, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claim_only_succeeds_once() {
        let store = InMemoryQueueStore::new();
        let item = store.enqueue(NewQueueItem::new(Uuid::new_v4(), Platform::Reddit)).await.unwrap();

        let claimed = store.claim(item.id).await.unwrap().unwrap();
        assert_eq!(claimed.status, QueueStatus::Processing);
        assert_eq!(claimed.attempts, 1);
        assert!(store.claim(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reschedule_returns_item_to_pending() {
        let store = InMemoryQueueStore::new();
        let item = store.enqueue(NewQueueItem::new(Uuid::new_v4(), Platform::Reddit)).await.unwrap();
        store.claim(item.id).await.unwrap();

        let later = Utc::now() + Duration::minutes(5);
        store.reschedule(item.id, later, "timeout").await.unwrap();

        let item = store.get(item.id).await.unwrap();
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.scheduled_for, later);
        assert_eq!(item.error_message.as_deref(), Some("timeout"));
        assert!(store.due(Utc::now(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cleanup_removes_only_old_completed_items() {
        let store = InMemoryQueueStore::new();
        let now = Utc::now();
        let old = store.enqueue(NewQueueItem::new(Uuid::new_v4(), Platform::Reddit)).await.unwrap();
        let recent = store.enqueue(NewQueueItem::new(Uuid::new_v4(), Platform::Reddit)).await.unwrap();
        let failed = store.enqueue(NewQueueItem::new(Uuid::new_v4(), Platform::Reddit)).await.unwrap();

        for id in [old.id, recent.id, failed.id] {
            store.claim(id).await.unwrap();
        }
        store.complete(old.id, now - Duration::days(8)).await.unwrap();
        store.complete(recent.id, now - Duration::days(1)).await.unwrap();
        store.fail(failed.id, "boom").await.unwrap();

        let removed = store.cleanup(now - Duration::days(7)).await.unwrap();
        assert_eq!(removed, 1);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn updating_unknown_item_is_not_found() {
        let store = InMemoryQueueStore::new();
        let err = store.fail(Uuid::new_v4(), "x").await.unwrap_err();
        assert!(matches!(err, QueueError::NotFound(_)));
    }
}

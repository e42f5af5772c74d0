//! Postgres-backed stores and pipeline wiring.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::models::{EngagementRow, QueueItemRow};
use db::repository::{articles, platforms, posts, queue as queue_repo, rules, schedule, tracking};
use db::{DbError, DbPool};
use publishers::{ContentFormatter, EngagementMetrics, Platform};
use queue::{NewQueueItem, QueueError, QueueItem, QueueStats, QueueStore, RetryPolicy};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Article, AutomationRule, PostRecord, PostRef, ScheduleSlot};
use crate::rules::default_rules;
use crate::{
    ArticleDetector, AutomationController, AutomationError, AutomationStore, EngagementSync, PublisherResolver,
    QueueProcessor,
};

// ---------------------------------------------------------------------------
// Queue store
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgQueueStore {
    pool: DbPool,
}

impl PgQueueStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: DbError) -> QueueError {
    QueueError::Store(e.to_string())
}

fn queue_item(row: QueueItemRow) -> Result<QueueItem, QueueError> {
    let bad = |msg: String| QueueError::InvalidRow(format!("{}: {msg}", row.id));
    Ok(QueueItem {
        platform: row.platform.parse().map_err(bad)?,
        status: row.status.parse().map_err(bad)?,
        attempts: u32::try_from(row.attempts).unwrap_or(0),
        id: row.id,
        article_id: row.article_id,
        priority: row.priority,
        scheduled_for: row.scheduled_for,
        error_message: row.error_message,
        created_at: row.created_at,
        processed_at: row.processed_at,
    })
}

#[async_trait]
impl QueueStore for PgQueueStore {
    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem, QueueError> {
        let row = queue_repo::enqueue(
            &self.pool,
            item.article_id,
            item.platform.as_str(),
            item.priority,
            item.scheduled_for.unwrap_or_else(Utc::now),
        )
        .await
        .map_err(store_err)?;
        queue_item(row)
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueItem>, QueueError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        queue_repo::due_items(&self.pool, now, limit)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(queue_item)
            .collect()
    }

    async fn claim(&self, id: Uuid) -> Result<Option<QueueItem>, QueueError> {
        queue_repo::claim(&self.pool, id)
            .await
            .map_err(store_err)?
            .map(queue_item)
            .transpose()
    }

    async fn reschedule(&self, id: Uuid, at: DateTime<Utc>, error: &str) -> Result<(), QueueError> {
        queue_repo::reschedule(&self.pool, id, at, error).await.map_err(store_err)
    }

    async fn complete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), QueueError> {
        queue_repo::complete(&self.pool, id, at).await.map_err(store_err)
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), QueueError> {
        queue_repo::fail(&self.pool, id, error).await.map_err(store_err)
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        let mut stats = QueueStats::default();
        for row in queue_repo::status_counts(&self.pool).await.map_err(store_err)? {
            match row.status.parse() {
                Ok(status) => stats.add(status, row.count),
                Err(e) => warn!("ignoring queue rows: {e}"),
            }
        }
        Ok(stats)
    }

    async fn cleanup(&self, cutoff: DateTime<Utc>) -> Result<u64, QueueError> {
        queue_repo::delete_completed_before(&self.pool, cutoff).await.map_err(store_err)
    }
}

// ---------------------------------------------------------------------------
// Automation store
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgAutomationStore {
    pool: DbPool,
}

impl PgAutomationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Parse stored platform names, skipping (and logging) unknown ones.
fn known_platforms(names: Vec<String>) -> Vec<Platform> {
    names
        .into_iter()
        .filter_map(|name| match name.parse() {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("{e}");
                None
            }
        })
        .collect()
}

#[async_trait]
impl AutomationStore for PgAutomationStore {
    async fn published_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>, AutomationError> {
        let rows = articles::published_since(&self.pool, since).await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn published_article(&self, id: Uuid) -> Result<Option<Article>, AutomationError> {
        Ok(articles::get_published_article(&self.pool, id).await?.map(Article::from))
    }

    async fn article(&self, id: Uuid) -> Result<Option<Article>, AutomationError> {
        match articles::get_article(&self.pool, id).await {
            Ok(row) => Ok(Some(row.into())),
            Err(DbError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn active_rules(&self) -> Result<Vec<AutomationRule>, AutomationError> {
        let mut rules = Vec::new();
        for row in rules::list_active_rules(&self.pool).await? {
            match AutomationRule::try_from(row) {
                Ok(rule) => rules.push(rule),
                Err(e) => warn!("skipping rule: {e}"),
            }
        }
        Ok(rules)
    }

    async fn active_platforms(&self) -> Result<Vec<Platform>, AutomationError> {
        Ok(known_platforms(platforms::active_platform_names(&self.pool).await?))
    }

    async fn platform_credentials(&self, platform: Platform) -> Result<Option<Value>, AutomationError> {
        let row = platforms::get_active_platform(&self.pool, platform.as_str()).await?;
        Ok(row.and_then(|r| r.credentials).filter(|c| !c.is_null()))
    }

    async fn touch_last_posted(&self, platform: Platform) -> Result<(), AutomationError> {
        Ok(platforms::touch_last_posted(&self.pool, platform.as_str()).await?)
    }

    async fn schedule_slots(&self, platform: Platform) -> Result<Vec<ScheduleSlot>, AutomationError> {
        let rows = schedule::active_slots(&self.pool, platform.as_str()).await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                Some(ScheduleSlot::new(
                    u32::try_from(r.day_of_week).ok()?,
                    u32::try_from(r.hour).ok()?,
                    u32::try_from(r.minute).ok()?,
                ))
            })
            .collect())
    }

    async fn slot_taken(&self, platform: Platform, at: DateTime<Utc>) -> Result<bool, AutomationError> {
        Ok(posts::slot_taken(&self.pool, platform.as_str(), at).await?)
    }

    async fn posted_platforms(&self, article_id: Uuid) -> Result<Vec<Platform>, AutomationError> {
        Ok(known_platforms(posts::posted_platforms(&self.pool, article_id).await?))
    }

    async fn reserve_short_code(
        &self,
        article_id: Uuid,
        platform: Platform,
        short_code: &str,
    ) -> Result<Uuid, AutomationError> {
        Ok(posts::reserve_short_code(&self.pool, article_id, platform.as_str(), short_code).await?)
    }

    async fn record_post(&self, record: &PostRecord) -> Result<(), AutomationError> {
        posts::upsert_post(&self.pool, &record.to_upsert()).await?;
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRef>, AutomationError> {
        match posts::get_post(&self.pool, id).await {
            Ok(row) => Ok(Some(PostRef::try_from(row)?)),
            Err(DbError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn mark_post_retry(&self, id: Uuid) -> Result<(), AutomationError> {
        match posts::mark_retry(&self.pool, id).await {
            Err(DbError::NotFound) => Err(AutomationError::PostNotFound(id)),
            other => Ok(other?),
        }
    }

    async fn recent_posts(&self, since: DateTime<Utc>) -> Result<Vec<PostRef>, AutomationError> {
        posts::recent_posted(&self.pool, since)
            .await?
            .into_iter()
            .map(PostRef::try_from)
            .collect()
    }

    async fn save_engagement(&self, post: Uuid, metrics: &EngagementMetrics) -> Result<(), AutomationError> {
        let row = EngagementRow {
            social_post_id: post,
            likes: metrics.likes,
            shares: metrics.shares,
            comments: metrics.comments,
            views: metrics.views,
            reach: metrics.reach,
            engagement_rate: metrics.engagement_rate,
            synced_at: Utc::now(),
        };
        Ok(tracking::upsert_engagement(&self.pool, &row).await?)
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Settings for [`build_controller`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Public site URL; links and tracking URLs are built on it.
    pub site_url: String,
    pub site_name: String,
    pub retry: RetryPolicy,
}

/// Wire detector, processor and engagement sync over Postgres.
pub fn build_controller(pool: DbPool, config: PipelineConfig, http: Client) -> AutomationController {
    let store: Arc<dyn AutomationStore> = Arc::new(PgAutomationStore::new(pool.clone()));
    let queue: Arc<dyn QueueStore> = Arc::new(PgQueueStore::new(pool));
    let resolver = Arc::new(PublisherResolver::new(store.clone(), http));

    let detector = Arc::new(ArticleDetector::new(store.clone(), queue.clone()));
    let processor = Arc::new(QueueProcessor::new(
        store.clone(),
        queue,
        resolver.clone(),
        ContentFormatter::new(config.site_url, config.site_name),
        config.retry,
    ));
    let engagement = Arc::new(EngagementSync::new(store, resolver));

    AutomationController::new(detector, processor, engagement)
}

/// Insert the default rules whose names are not taken yet. Returns how many
/// were inserted.
pub async fn seed_default_rules(pool: &DbPool) -> Result<usize, AutomationError> {
    let existing = rules::rule_names(pool).await?;
    let mut inserted = 0;

    for rule in default_rules() {
        if existing.contains(&rule.name) {
            continue;
        }
        rules::create_rule(pool, &rule.to_row()?).await?;
        info!(name = %rule.name, "seeded automation rule");
        inserted += 1;
    }

    Ok(inserted)
}

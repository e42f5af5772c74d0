//! The storage seam for the pipeline.
//!
//! [`PgAutomationStore`](crate::pg::PgAutomationStore) is the production
//! implementation; the pipeline tests use an in-memory one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use publishers::{EngagementMetrics, Platform};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Article, AutomationRule, PostRecord, PostRef, ScheduleSlot};
use crate::AutomationError;

#[async_trait]
pub trait AutomationStore: Send + Sync {
    // ---- articles ----

    /// Published articles that went live after `since`, newest first.
    async fn published_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>, AutomationError>;

    async fn published_article(&self, id: Uuid) -> Result<Option<Article>, AutomationError>;

    /// Any article, whatever its status.
    async fn article(&self, id: Uuid) -> Result<Option<Article>, AutomationError>;

    // ---- rules, platforms, schedule ----

    async fn active_rules(&self) -> Result<Vec<AutomationRule>, AutomationError>;

    async fn active_platforms(&self) -> Result<Vec<Platform>, AutomationError>;

    /// Credentials of `platform` when it is active and has some.
    async fn platform_credentials(&self, platform: Platform) -> Result<Option<Value>, AutomationError>;

    async fn touch_last_posted(&self, platform: Platform) -> Result<(), AutomationError>;

    async fn schedule_slots(&self, platform: Platform) -> Result<Vec<ScheduleSlot>, AutomationError>;

    /// Whether something on `platform` is already scheduled for `at`.
    async fn slot_taken(&self, platform: Platform, at: DateTime<Utc>) -> Result<bool, AutomationError>;

    // ---- social posts ----

    /// Platforms `article_id` has any post row for.
    async fn posted_platforms(&self, article_id: Uuid) -> Result<Vec<Platform>, AutomationError>;

    /// Ensure a pending post row exists and give it `short_code`.
    async fn reserve_short_code(
        &self,
        article_id: Uuid,
        platform: Platform,
        short_code: &str,
    ) -> Result<Uuid, AutomationError>;

    /// Upsert the post row for `(record.article_id, record.platform)`.
    async fn record_post(&self, record: &PostRecord) -> Result<(), AutomationError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRef>, AutomationError>;

    /// Set the post back to pending and bump its retry counter.
    async fn mark_post_retry(&self, id: Uuid) -> Result<(), AutomationError>;

    /// Posted posts with a platform id, posted at or after `since`.
    async fn recent_posts(&self, since: DateTime<Utc>) -> Result<Vec<PostRef>, AutomationError>;

    async fn save_engagement(&self, post: Uuid, metrics: &EngagementMetrics) -> Result<(), AutomationError>;
}

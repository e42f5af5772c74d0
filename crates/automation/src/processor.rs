//! Queue processing.
//!
//! `QueueProcessor` drains due queue items one at a time:
//! 1. Claims the item (`pending → processing`, attempts + 1).
//! 2. Loads the article and builds a tracked short link.
//! 3. Formats content for the platform and posts it through its publisher.
//! 4. Records the social post and completes the item, or applies the
//!    [`RetryPolicy`] on failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use publishers::{ContentFormatter, Platform, PublishError, SocialContent};
use queue::{NewQueueItem, QueueItem, QueueStats, QueueStore, RetryDecision, RetryPolicy, BATCH_SIZE};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::models::{Article, PostRecord, PostStatus};
use crate::{AutomationError, AutomationStore, PublisherResolver};

/// Short codes in tracking links are this many characters.
pub const SHORT_CODE_LEN: usize = 8;

/// Priority given to manually retried posts.
pub const MANUAL_RETRY_PRIORITY: i32 = 10;

/// `now` minus `days`, or `None` when `days` is negative or out of range.
pub fn cleanup_cutoff(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    if days < 0 {
        return None;
    }
    now.checked_sub_signed(Duration::try_days(days)?)
}

/// Counts from one processing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub processed: usize,
    pub posted: usize,
    pub rescheduled: usize,
    pub failed: usize,
}

enum Outcome {
    Posted,
    Rescheduled,
    Failed,
    /// Claimed by someone else between `due` and `claim`.
    Skipped,
}

pub struct QueueProcessor {
    store: Arc<dyn AutomationStore>,
    queue: Arc<dyn QueueStore>,
    publishers: Arc<PublisherResolver>,
    formatter: ContentFormatter,
    policy: RetryPolicy,
    processing: AtomicBool,
}

/// Resets the processing flag when a pass ends, including on early return.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl QueueProcessor {
    pub fn new(
        store: Arc<dyn AutomationStore>,
        queue: Arc<dyn QueueStore>,
        publishers: Arc<PublisherResolver>,
        formatter: ContentFormatter,
        policy: RetryPolicy,
    ) -> Self {
        Self { store, queue, publishers, formatter, policy, processing: AtomicBool::new(false) }
    }

    pub fn publishers(&self) -> &Arc<PublisherResolver> {
        &self.publishers
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Process up to one batch of due items.
    ///
    /// Returns an empty summary when another pass is already running.
    #[instrument(skip(self))]
    pub async fn process_due(&self) -> Result<ProcessSummary, AutomationError> {
        if self.processing.swap(true, Ordering::SeqCst) {
            warn!("previous queue pass still running; skipping");
            return Ok(ProcessSummary::default());
        }
        let _guard = PassGuard(&self.processing);

        let items = self.queue.due(Utc::now(), BATCH_SIZE).await?;
        let mut summary = ProcessSummary::default();
        if items.is_empty() {
            return Ok(summary);
        }
        info!("processing {} queue item(s)", items.len());

        for item in items {
            let outcome = match self.process_item(&item).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(item_id = %item.id, "queue bookkeeping failed: {e}");
                    continue;
                }
            };
            match outcome {
                Outcome::Posted      => summary.posted += 1,
                Outcome::Rescheduled => summary.rescheduled += 1,
                Outcome::Failed      => summary.failed += 1,
                Outcome::Skipped     => continue,
            }
            summary.processed += 1;
        }

        info!(
            posted = summary.posted,
            rescheduled = summary.rescheduled,
            failed = summary.failed,
            "queue pass finished"
        );
        Ok(summary)
    }

    async fn process_item(&self, item: &QueueItem) -> Result<Outcome, AutomationError> {
        let Some(item) = self.queue.claim(item.id).await? else {
            return Ok(Outcome::Skipped);
        };

        match self.publish(&item).await {
            Ok(()) => Ok(Outcome::Posted),
            Err(err) => self.handle_failure(&item, err).await,
        }
    }

    async fn publish(&self, item: &QueueItem) -> Result<(), PublishError> {
        let platform = item.platform;
        let article = self
            .store
            .article(item.article_id)
            .await
            .map_err(|e| PublishError::Retryable(format!("loading article: {e}")))?
            .ok_or_else(|| PublishError::Fatal("Article not found".into()))?;

        let content = self.content_for(&article, platform).await;

        let publisher = self.publishers.resolve(platform).await?;
        let limit = publisher.rate_limit().await?;
        if limit.is_exhausted() {
            return Err(PublishError::Retryable(format!(
                "{platform} rate limit exhausted until {}",
                limit.reset.to_rfc3339()
            )));
        }

        let receipt = publisher.post(&content).await?;
        info!(item_id = %item.id, %platform, post_id = %receipt.post_id, "posted");

        let record = PostRecord {
            article_id: article.id,
            platform,
            status: PostStatus::Posted,
            content: content.text.clone(),
            media_urls: content.media_url.iter().cloned().collect(),
            hashtags: content.hashtags.clone(),
            post_id: Some(receipt.post_id),
            post_url: Some(receipt.post_url),
            error_message: None,
            posted_at: Some(Utc::now()),
        };
        // The post is live; bookkeeping failures must not trigger a re-post.
        if let Err(e) = self.store.record_post(&record).await {
            error!(item_id = %item.id, "recording social post failed: {e}");
        }
        if let Err(e) = self.queue.complete(item.id, Utc::now()).await {
            error!(item_id = %item.id, "completing queue item failed: {e}");
        }
        if let Err(e) = self.store.touch_last_posted(platform).await {
            warn!(%platform, "updating last_posted_at failed: {e}");
        }
        Ok(())
    }

    /// Formatted content whose link points at the click tracker.
    async fn content_for(&self, article: &Article, platform: Platform) -> SocialContent {
        let tracking = self.tracking_link(article, platform).await;
        let mut content = self.formatter.format(&article.to_source(), platform, &mut rand::thread_rng());
        if !content.link.is_empty() {
            content.text = content.text.replace(&content.link, &tracking);
        }
        content.link = tracking;
        content
    }

    /// `{site}/api/track/social?c=<code>`, or a plain UTM link when the
    /// short code cannot be stored.
    async fn tracking_link(&self, article: &Article, platform: Platform) -> String {
        let code = nanoid::nanoid!(SHORT_CODE_LEN);
        match self.store.reserve_short_code(article.id, platform, &code).await {
            Ok(_) => format!("{}/api/track/social?c={code}", self.formatter.base_url()),
            Err(e) => {
                warn!(article_id = %article.id, %platform, "short code reservation failed: {e}");
                format!("{}/articles/{}?utm_source={platform}", self.formatter.base_url(), article.slug)
            }
        }
    }

    async fn handle_failure(&self, item: &QueueItem, err: PublishError) -> Result<Outcome, AutomationError> {
        let message = err.to_string();

        match self.policy.decide_for(&err, item.attempts) {
            RetryDecision::Retry { delay } => {
                let at = Utc::now() + delay;
                warn!(
                    item_id = %item.id,
                    platform = %item.platform,
                    attempt = item.attempts,
                    "post failed, retrying at {at}: {message}"
                );
                self.queue.reschedule(item.id, at, &message).await?;
                Ok(Outcome::Rescheduled)
            }
            RetryDecision::GiveUp => {
                error!(
                    item_id = %item.id,
                    platform = %item.platform,
                    attempt = item.attempts,
                    "post failed permanently: {message}"
                );
                self.queue.fail(item.id, &message).await?;
                let record = PostRecord::failed(item.article_id, item.platform, &message);
                if let Err(e) = self.store.record_post(&record).await {
                    warn!(item_id = %item.id, "recording failed post failed: {e}");
                }
                Ok(Outcome::Failed)
            }
        }
    }

    /// Queue counts plus whether a pass is running right now.
    pub async fn stats(&self) -> Result<QueueStats, AutomationError> {
        let mut stats = self.queue.stats().await?;
        stats.is_processing = self.is_processing();
        Ok(stats)
    }

    /// Delete completed items processed more than `days` days ago.
    ///
    /// # Errors
    /// `InvalidRetention` when `days` is negative or reaches past the
    /// representable calendar.
    pub async fn cleanup(&self, days: i64) -> Result<u64, AutomationError> {
        let cutoff = cleanup_cutoff(Utc::now(), days).ok_or(AutomationError::InvalidRetention(days))?;
        let removed = self.queue.cleanup(cutoff).await?;
        info!(removed, days, "queue cleanup finished");
        Ok(removed)
    }

    /// Re-queue a stored social post at high priority, due now.
    ///
    /// # Errors
    /// `PostNotFound` when no post has this id.
    #[instrument(skip(self))]
    pub async fn retry_post(&self, post_id: Uuid) -> Result<QueueItem, AutomationError> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or(AutomationError::PostNotFound(post_id))?;

        let item = self
            .queue
            .enqueue(
                NewQueueItem::new(post.article_id, post.platform)
                    .priority(MANUAL_RETRY_PRIORITY)
                    .at(Utc::now()),
            )
            .await?;
        self.store.mark_post_retry(post_id).await?;

        info!(%post_id, platform = %post.platform, "post re-queued");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_cutoff_bounds() {
        let now = Utc::now();
        assert_eq!(cleanup_cutoff(now, 0), Some(now));
        assert_eq!(cleanup_cutoff(now, 7), Some(now - Duration::days(7)));
        assert_eq!(cleanup_cutoff(now, -1), None);
        assert_eq!(cleanup_cutoff(now, 1_000_000_000_000), None);
        assert_eq!(cleanup_cutoff(now, i64::MAX), None);
        assert_eq!(cleanup_cutoff(now, 100_000_000), None);
    }
}

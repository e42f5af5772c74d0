//! New-article detection.
//!
//! Each check fetches the articles published since the previous successful
//! check, selects platforms through the automation rules, and enqueues one
//! job per platform with a priority and a slot-based schedule time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use publishers::Platform;
use queue::{NewQueueItem, QueueStore};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::models::Article;
use crate::priority::priority_for;
use crate::rules::select_platforms;
use crate::schedule::{candidate_times, ALL_TAKEN_DELAY_MINS, LOOKUP_ERROR_DELAY_MINS, NO_SLOTS_DELAY_MINS};
use crate::{AutomationError, AutomationStore};

/// Result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionReport {
    pub articles: usize,
    pub queued: usize,
}

pub struct ArticleDetector {
    store: Arc<dyn AutomationStore>,
    queue: Arc<dyn QueueStore>,
    last_check: RwLock<DateTime<Utc>>,
}

impl ArticleDetector {
    /// A detector that only sees articles published from now on.
    pub fn new(store: Arc<dyn AutomationStore>, queue: Arc<dyn QueueStore>) -> Self {
        Self::since(store, queue, Utc::now())
    }

    pub fn since(store: Arc<dyn AutomationStore>, queue: Arc<dyn QueueStore>, last_check: DateTime<Utc>) -> Self {
        Self { store, queue, last_check: RwLock::new(last_check) }
    }

    pub async fn last_check_time(&self) -> DateTime<Utc> {
        *self.last_check.read().await
    }

    /// Queue every article published since the last successful check.
    ///
    /// The watermark moves to this check's start time only when the fetch
    /// succeeded. A failure on one article is logged and does not stop the
    /// others.
    #[instrument(skip(self))]
    pub async fn check(&self) -> Result<DetectionReport, AutomationError> {
        let started = Utc::now();
        let since = self.last_check_time().await;

        let articles = self.store.published_since(since).await.map_err(|e| {
            error!("fetching new articles failed: {e}");
            e
        })?;

        let mut report = DetectionReport { articles: articles.len(), queued: 0 };
        if articles.is_empty() {
            debug!("no new articles");
        } else {
            info!("found {} new article(s)", articles.len());
        }

        for article in &articles {
            match self.process_article(article).await {
                Ok(platforms) => report.queued += platforms.len(),
                Err(e) => error!(article_id = %article.id, "processing article failed: {e}"),
            }
        }

        *self.last_check.write().await = started;
        Ok(report)
    }

    /// Run detection for one article on demand.
    ///
    /// # Errors
    /// `ArticleNotFound` when the article is missing or not published.
    #[instrument(skip(self))]
    pub async fn detect_article(&self, article_id: Uuid) -> Result<Vec<Platform>, AutomationError> {
        let article = self
            .store
            .published_article(article_id)
            .await?
            .ok_or(AutomationError::ArticleNotFound(article_id))?;
        self.process_article(&article).await
    }

    /// Enqueue `article` on every platform its matching rules select.
    async fn process_article(&self, article: &Article) -> Result<Vec<Platform>, AutomationError> {
        let posted = self.store.posted_platforms(article.id).await?;
        let rules = self.store.active_rules().await?;
        let active = self.store.active_platforms().await?;

        let platforms = select_platforms(&rules, article, &posted, &active);
        if platforms.is_empty() {
            info!(article_id = %article.id, "no platforms to post to");
            return Ok(platforms);
        }

        let priority = priority_for(article);
        for &platform in &platforms {
            let at = self.schedule_time(platform).await;
            self.queue
                .enqueue(NewQueueItem::new(article.id, platform).priority(priority).at(at))
                .await?;
        }

        info!(
            article_id = %article.id,
            priority,
            "queued for {}",
            platforms.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
        );
        Ok(platforms)
    }

    /// When to post on `platform`: the first free weekly slot.
    pub async fn schedule_time(&self, platform: Platform) -> DateTime<Utc> {
        let now = Utc::now();
        match self.free_slot(platform, now).await {
            Ok(at) => at,
            Err(e) => {
                warn!(%platform, "schedule lookup failed: {e}");
                now + Duration::minutes(LOOKUP_ERROR_DELAY_MINS)
            }
        }
    }

    async fn free_slot(&self, platform: Platform, now: DateTime<Utc>) -> Result<DateTime<Utc>, AutomationError> {
        let slots = self.store.schedule_slots(platform).await?;
        if slots.is_empty() {
            return Ok(now + Duration::minutes(NO_SLOTS_DELAY_MINS));
        }

        for at in candidate_times(&slots, now) {
            if !self.store.slot_taken(platform, at).await? {
                return Ok(at);
            }
        }
        Ok(now + Duration::minutes(ALL_TAKEN_DELAY_MINS))
    }
}

//! Pipeline tests for detection, queue processing and control.
//!
//! These run the real detector and processor against an in-memory
//! `AutomationStore`, `InMemoryQueueStore` and `MockPublisher`, so no
//! Postgres connection is required.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use publishers::mock::MockPublisher;
use publishers::{ContentFormatter, EngagementMetrics, Platform};
use queue::{InMemoryQueueStore, NewQueueItem, QueueStatus, QueueStore, RetryPolicy};
use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Article, AutomationRule, PostRecord, PostRef, PostStatus, RuleConditions, RuleType, ScheduleSlot};
use crate::{
    ArticleDetector, AutomationController, AutomationError, AutomationStore, EngagementSync, PublisherResolver,
    QueueProcessor, StartOutcome,
};

// ---------------------------------------------------------------------------
// In-memory automation store
// ---------------------------------------------------------------------------

struct StoredPost {
    id: Uuid,
    record: PostRecord,
    short_code: Option<String>,
    retry_count: i32,
}

#[derive(Default)]
struct MemoryStore {
    articles: Mutex<Vec<Article>>,
    rules: Mutex<Vec<AutomationRule>>,
    active: Mutex<Vec<Platform>>,
    credentials: Mutex<HashMap<Platform, Value>>,
    slots: Mutex<HashMap<Platform, Vec<ScheduleSlot>>>,
    taken: Mutex<Vec<(Platform, DateTime<Utc>)>>,
    posts: Mutex<Vec<StoredPost>>,
    engagement: Mutex<HashMap<Uuid, EngagementMetrics>>,
    fail_fetch: AtomicBool,
    fail_slots: AtomicBool,
}

impl MemoryStore {
    fn add_article(&self, article: Article) {
        self.articles.lock().unwrap().push(article);
    }

    fn post_for(&self, article_id: Uuid, platform: Platform) -> Option<(PostRecord, Option<String>, i32)> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.record.article_id == article_id && p.record.platform == platform)
            .map(|p| (p.record.clone(), p.short_code.clone(), p.retry_count))
    }

    fn upsert(&self, record: PostRecord) -> Uuid {
        let mut posts = self.posts.lock().unwrap();
        if let Some(post) = posts
            .iter_mut()
            .find(|p| p.record.article_id == record.article_id && p.record.platform == record.platform)
        {
            post.record = record;
            return post.id;
        }
        let id = Uuid::new_v4();
        posts.push(StoredPost { id, record, short_code: None, retry_count: 0 });
        id
    }
}

#[async_trait]
impl AutomationStore for MemoryStore {
    async fn published_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>, AutomationError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(AutomationError::Store("connection reset".into()));
        }
        let mut found: Vec<Article> = self
            .articles
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.published && a.published_at.is_some_and(|at| at > since))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(found)
    }

    async fn published_article(&self, id: Uuid) -> Result<Option<Article>, AutomationError> {
        Ok(self.articles.lock().unwrap().iter().find(|a| a.id == id && a.published).cloned())
    }

    async fn article(&self, id: Uuid) -> Result<Option<Article>, AutomationError> {
        Ok(self.articles.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn active_rules(&self) -> Result<Vec<AutomationRule>, AutomationError> {
        Ok(self.rules.lock().unwrap().clone())
    }

    async fn active_platforms(&self) -> Result<Vec<Platform>, AutomationError> {
        Ok(self.active.lock().unwrap().clone())
    }

    async fn platform_credentials(&self, platform: Platform) -> Result<Option<Value>, AutomationError> {
        Ok(self.credentials.lock().unwrap().get(&platform).cloned())
    }

    async fn touch_last_posted(&self, _platform: Platform) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn schedule_slots(&self, platform: Platform) -> Result<Vec<ScheduleSlot>, AutomationError> {
        if self.fail_slots.load(Ordering::SeqCst) {
            return Err(AutomationError::Store("schedule table missing".into()));
        }
        Ok(self.slots.lock().unwrap().get(&platform).cloned().unwrap_or_default())
    }

    async fn slot_taken(&self, platform: Platform, at: DateTime<Utc>) -> Result<bool, AutomationError> {
        Ok(self.taken.lock().unwrap().contains(&(platform, at)))
    }

    async fn posted_platforms(&self, article_id: Uuid) -> Result<Vec<Platform>, AutomationError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.record.article_id == article_id)
            .map(|p| p.record.platform)
            .collect())
    }

    async fn reserve_short_code(
        &self,
        article_id: Uuid,
        platform: Platform,
        short_code: &str,
    ) -> Result<Uuid, AutomationError> {
        let id = match self.post_for(article_id, platform) {
            Some((record, _, _)) => self.upsert(record),
            None => self.upsert(PostRecord {
                status: PostStatus::Pending,
                error_message: None,
                ..PostRecord::failed(article_id, platform, "")
            }),
        };
        let mut posts = self.posts.lock().unwrap();
        if let Some(post) = posts.iter_mut().find(|p| p.id == id) {
            post.short_code = Some(short_code.to_owned());
        }
        Ok(id)
    }

    async fn record_post(&self, record: &PostRecord) -> Result<(), AutomationError> {
        self.upsert(record.clone());
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRef>, AutomationError> {
        Ok(self.posts.lock().unwrap().iter().find(|p| p.id == id).map(|p| PostRef {
            id: p.id,
            article_id: p.record.article_id,
            platform: p.record.platform,
            post_id: p.record.post_id.clone(),
        }))
    }

    async fn mark_post_retry(&self, id: Uuid) -> Result<(), AutomationError> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts.iter_mut().find(|p| p.id == id).ok_or(AutomationError::PostNotFound(id))?;
        post.record.status = PostStatus::Pending;
        post.retry_count += 1;
        Ok(())
    }

    async fn recent_posts(&self, since: DateTime<Utc>) -> Result<Vec<PostRef>, AutomationError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p.record.status == PostStatus::Posted
                    && p.record.post_id.is_some()
                    && p.record.posted_at.is_some_and(|at| at >= since)
            })
            .map(|p| PostRef {
                id: p.id,
                article_id: p.record.article_id,
                platform: p.record.platform,
                post_id: p.record.post_id.clone(),
            })
            .collect())
    }

    async fn save_engagement(&self, post: Uuid, metrics: &EngagementMetrics) -> Result<(), AutomationError> {
        self.engagement.lock().unwrap().insert(post, metrics.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Pipeline {
    store: Arc<MemoryStore>,
    queue: Arc<InMemoryQueueStore>,
    resolver: Arc<PublisherResolver>,
    detector: Arc<ArticleDetector>,
    processor: Arc<QueueProcessor>,
}

fn pipeline() -> Pipeline {
    let store = Arc::new(MemoryStore::default());
    let queue = Arc::new(InMemoryQueueStore::new());
    let resolver = Arc::new(PublisherResolver::new(store.clone(), Client::new()));
    let detector = Arc::new(ArticleDetector::since(
        store.clone(),
        queue.clone(),
        Utc::now() - Duration::hours(1),
    ));
    let processor = Arc::new(QueueProcessor::new(
        store.clone(),
        queue.clone(),
        resolver.clone(),
        ContentFormatter::new("https://news.example.com", "Newsroom"),
        RetryPolicy::default(),
    ));
    Pipeline { store, queue, resolver, detector, processor }
}

fn fitness_article() -> Article {
    Article {
        id: Uuid::new_v4(),
        title: "Ten-minute leg workout".into(),
        slug: "ten-minute-leg-workout".into(),
        excerpt: "A quick routine for busy days.".into(),
        content: "squat ".repeat(600),
        category: "fitness".into(),
        tags: vec!["legs".into()],
        featured_image: Some("https://cdn.example.com/legs.jpg".into()),
        featured: false,
        published: true,
        published_at: Some(Utc::now() - Duration::minutes(5)),
    }
}

fn all_platforms_rule() -> AutomationRule {
    AutomationRule {
        id: Uuid::new_v4(),
        name: "Fitness everywhere".into(),
        description: None,
        rule_type: RuleType::CategoryBased,
        conditions: RuleConditions { categories: Some(vec!["fitness".into()]), ..Default::default() },
        platforms: Platform::ALL.to_vec(),
        is_active: true,
        priority: 10,
    }
}

/// Queue one item for `article` on `platform`, due now.
async fn queue_now(p: &Pipeline, article: &Article, platform: Platform) -> Uuid {
    p.queue
        .enqueue(NewQueueItem::new(article.id, platform).at(Utc::now() - Duration::seconds(1)))
        .await
        .unwrap()
        .id
}

/// Make a rescheduled item due again.
async fn make_due(p: &Pipeline, id: Uuid) {
    p.queue.reschedule(id, Utc::now() - Duration::seconds(1), "forced").await.unwrap();
}

fn assert_close(actual: DateTime<Utc>, expected: DateTime<Utc>) {
    let drift = (actual - expected).num_seconds().abs();
    assert!(drift <= 5, "expected ~{expected}, got {actual}");
}

// ============================================================
// Detection
// ============================================================

#[tokio::test]
async fn detector_queues_article_on_matching_active_platforms() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    p.store.rules.lock().unwrap().push(all_platforms_rule());
    *p.store.active.lock().unwrap() = vec![Platform::Reddit, Platform::Facebook];

    let report = p.detector.check().await.unwrap();
    assert_eq!(report.articles, 1);
    assert_eq!(report.queued, 2);

    let items = p.queue.all().await;
    let mut platforms: Vec<Platform> = items.iter().map(|i| i.platform).collect();
    platforms.sort();
    assert_eq!(platforms, vec![Platform::Reddit, Platform::Facebook]);

    for item in &items {
        assert_eq!(item.article_id, article.id);
        assert_eq!(item.priority, 5);
        assert_eq!(item.status, QueueStatus::Pending);
        assert_close(item.scheduled_for, Utc::now() + Duration::minutes(15));
    }
}

#[tokio::test]
async fn detector_skips_platforms_already_posted() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    p.store.rules.lock().unwrap().push(all_platforms_rule());
    *p.store.active.lock().unwrap() = Platform::ALL.to_vec();
    p.store.record_post(&PostRecord::failed(article.id, Platform::Twitter, "earlier")).await.unwrap();

    let queued = p.detector.detect_article(article.id).await.unwrap();
    assert_eq!(queued, vec![Platform::Reddit, Platform::Facebook, Platform::Instagram]);
}

#[tokio::test]
async fn watermark_advances_so_articles_are_queued_once() {
    let p = pipeline();
    p.store.add_article(fitness_article());
    p.store.rules.lock().unwrap().push(all_platforms_rule());
    *p.store.active.lock().unwrap() = vec![Platform::Reddit];

    let before = p.detector.last_check_time().await;
    assert_eq!(p.detector.check().await.unwrap().queued, 1);
    assert!(p.detector.last_check_time().await > before);

    assert_eq!(p.detector.check().await.unwrap().articles, 0);
    assert_eq!(p.queue.all().await.len(), 1);
}

#[tokio::test]
async fn failed_fetch_keeps_the_watermark() {
    let p = pipeline();
    let before = p.detector.last_check_time().await;

    p.store.fail_fetch.store(true, Ordering::SeqCst);
    assert!(p.detector.check().await.is_err());
    assert_eq!(p.detector.last_check_time().await, before);

    p.store.fail_fetch.store(false, Ordering::SeqCst);
    p.detector.check().await.unwrap();
    assert!(p.detector.last_check_time().await > before);
}

#[tokio::test]
async fn detect_article_rejects_drafts() {
    let p = pipeline();
    let mut draft = fitness_article();
    draft.published = false;
    p.store.add_article(draft.clone());

    let err = p.detector.detect_article(draft.id).await.unwrap_err();
    assert!(matches!(err, AutomationError::ArticleNotFound(id) if id == draft.id));
}

#[tokio::test]
async fn schedule_uses_first_free_slot_then_falls_back() {
    let p = pipeline();
    let slots = vec![ScheduleSlot::new(1, 9, 0), ScheduleSlot::new(4, 18, 30)];
    p.store.slots.lock().unwrap().insert(Platform::Facebook, slots.clone());

    let candidates = crate::schedule::candidate_times(&slots, Utc::now());
    let first = p.detector.schedule_time(Platform::Facebook).await;
    assert_eq!(first, candidates[0]);

    p.store.taken.lock().unwrap().push((Platform::Facebook, candidates[0]));
    assert_eq!(p.detector.schedule_time(Platform::Facebook).await, candidates[1]);

    p.store.taken.lock().unwrap().push((Platform::Facebook, candidates[1]));
    assert_close(p.detector.schedule_time(Platform::Facebook).await, Utc::now() + Duration::hours(1));

    p.store.fail_slots.store(true, Ordering::SeqCst);
    assert_close(p.detector.schedule_time(Platform::Facebook).await, Utc::now() + Duration::minutes(30));
}

// ============================================================
// Queue processing
// ============================================================

#[tokio::test]
async fn successful_post_completes_item_and_records_tracked_post() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    let mock = Arc::new(MockPublisher::succeeding(Platform::Reddit));
    p.resolver.registry().insert(mock.clone()).await;
    let id = queue_now(&p, &article, Platform::Reddit).await;

    let summary = p.processor.process_due().await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.posted, 1);

    let item = p.queue.get(id).await.unwrap();
    assert_eq!(item.status, QueueStatus::Completed);
    assert_eq!(item.attempts, 1);
    assert!(item.processed_at.is_some());

    let (record, code, _) = p.store.post_for(article.id, Platform::Reddit).unwrap();
    let code = code.expect("short code reserved");
    assert_eq!(code.len(), 8);
    assert_eq!(record.status, PostStatus::Posted);
    assert_eq!(record.post_id.as_deref(), Some("reddit-1"));
    assert!(record.posted_at.is_some());

    let sent = mock.calls.lock().unwrap()[0].clone();
    assert_eq!(sent.link, format!("https://news.example.com/api/track/social?c={code}"));
    assert!(sent.hashtags.is_empty());
}

#[tokio::test]
async fn tracking_link_replaces_direct_link_in_text() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    let mock = Arc::new(MockPublisher::succeeding(Platform::Facebook));
    p.resolver.registry().insert(mock.clone()).await;
    queue_now(&p, &article, Platform::Facebook).await;

    p.processor.process_due().await.unwrap();

    let sent = mock.calls.lock().unwrap()[0].clone();
    assert!(sent.text.contains(&format!("Read more: {}", sent.link)));
    assert!(!sent.text.contains("utm_source"));
    assert_eq!(sent.media_url.as_deref(), Some("https://cdn.example.com/legs.jpg"));
}

#[tokio::test]
async fn retryable_failures_back_off_then_fail_on_fourth_attempt() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    let mock = Arc::new(MockPublisher::failing_retryable(Platform::Twitter, "503 from upstream"));
    p.resolver.registry().insert(mock.clone()).await;
    let id = queue_now(&p, &article, Platform::Twitter).await;

    for (attempt, minutes) in [(1, 5), (2, 10), (3, 20)] {
        let summary = p.processor.process_due().await.unwrap();
        assert_eq!(summary.rescheduled, 1, "attempt {attempt}");

        let item = p.queue.get(id).await.unwrap();
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.attempts, attempt);
        assert_eq!(item.error_message.as_deref(), Some("503 from upstream"));
        assert_close(item.scheduled_for, Utc::now() + Duration::minutes(minutes));
        make_due(&p, id).await;
    }

    let summary = p.processor.process_due().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(p.queue.get(id).await.unwrap().status, QueueStatus::Failed);
    assert_eq!(mock.call_count(), 4);

    let (record, _, _) = p.store.post_for(article.id, Platform::Twitter).unwrap();
    assert_eq!(record.status, PostStatus::Failed);
    assert_eq!(record.error_message.as_deref(), Some("503 from upstream"));
}

#[tokio::test]
async fn flaky_publisher_succeeds_on_retry() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    p.resolver.registry().insert(Arc::new(MockPublisher::flaky(Platform::Reddit, 1))).await;
    let id = queue_now(&p, &article, Platform::Reddit).await;

    assert_eq!(p.processor.process_due().await.unwrap().rescheduled, 1);
    make_due(&p, id).await;
    assert_eq!(p.processor.process_due().await.unwrap().posted, 1);

    let item = p.queue.get(id).await.unwrap();
    assert_eq!(item.status, QueueStatus::Completed);
    assert_eq!(item.attempts, 2);
}

#[tokio::test]
async fn fatal_failure_fails_immediately() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    let mock = Arc::new(MockPublisher::failing_fatal(Platform::Reddit, "SUBREDDIT_NOEXIST"));
    p.resolver.registry().insert(mock.clone()).await;
    let id = queue_now(&p, &article, Platform::Reddit).await;

    assert_eq!(p.processor.process_due().await.unwrap().failed, 1);
    assert_eq!(p.queue.get(id).await.unwrap().status, QueueStatus::Failed);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn missing_article_fails_item() {
    let p = pipeline();
    let ghost = fitness_article();
    p.resolver.registry().insert(Arc::new(MockPublisher::succeeding(Platform::Reddit))).await;
    let id = queue_now(&p, &ghost, Platform::Reddit).await;

    p.processor.process_due().await.unwrap();

    let item = p.queue.get(id).await.unwrap();
    assert_eq!(item.status, QueueStatus::Failed);
    assert_eq!(item.error_message.as_deref(), Some("Article not found"));
}

#[tokio::test]
async fn exhausted_rate_limit_reschedules_without_posting() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    let mock = Arc::new(MockPublisher::succeeding(Platform::Twitter).with_remaining(0));
    p.resolver.registry().insert(mock.clone()).await;
    let id = queue_now(&p, &article, Platform::Twitter).await;

    assert_eq!(p.processor.process_due().await.unwrap().rescheduled, 1);
    assert_eq!(mock.call_count(), 0);
    let item = p.queue.get(id).await.unwrap();
    assert!(item.error_message.unwrap().contains("rate limit"));
}

#[tokio::test]
async fn unconfigured_platform_fails_without_retry() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    let id = queue_now(&p, &article, Platform::Instagram).await;

    assert_eq!(p.processor.process_due().await.unwrap().failed, 1);
    assert_eq!(p.queue.get(id).await.unwrap().status, QueueStatus::Failed);
}

#[tokio::test]
async fn malformed_stored_credentials_fail_without_retry() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    p.store
        .credentials
        .lock()
        .unwrap()
        .insert(Platform::Twitter, serde_json::json!({ "api_key": "wrong shape" }));
    let id = queue_now(&p, &article, Platform::Twitter).await;

    assert_eq!(p.processor.process_due().await.unwrap().failed, 1);
    assert!(p.resolver.registry().get(Platform::Twitter).await.is_none());
    assert_eq!(p.queue.get(id).await.unwrap().status, QueueStatus::Failed);
}

#[tokio::test]
async fn batch_is_capped_and_ordered_by_priority() {
    let p = pipeline();
    let mock = Arc::new(MockPublisher::succeeding(Platform::Reddit));
    p.resolver.registry().insert(mock.clone()).await;

    let mut urgent = None;
    for n in 0..12 {
        let mut article = fitness_article();
        article.title = format!("Article {n}");
        p.store.add_article(article.clone());
        let priority = if n == 11 { 50 } else { 0 };
        p.queue
            .enqueue(NewQueueItem::new(article.id, Platform::Reddit).priority(priority).at(Utc::now() - Duration::minutes(1)))
            .await
            .unwrap();
        if n == 11 {
            urgent = Some(article.title);
        }
    }

    let summary = p.processor.process_due().await.unwrap();
    assert_eq!(summary.processed, 10);
    assert_eq!(p.queue.stats().await.unwrap().pending, 2);

    let first = mock.calls.lock().unwrap()[0].clone();
    assert!(first.text.contains(urgent.as_deref().unwrap()));
}

#[tokio::test]
async fn stats_and_cleanup() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    p.resolver.registry().insert(Arc::new(MockPublisher::succeeding(Platform::Reddit))).await;
    let id = queue_now(&p, &article, Platform::Reddit).await;
    p.processor.process_due().await.unwrap();

    let stats = p.processor.stats().await.unwrap();
    assert_eq!(stats.completed, 1);
    assert!(!stats.is_processing);

    assert_eq!(p.processor.cleanup(7).await.unwrap(), 0);
    p.queue.complete(id, Utc::now() - Duration::days(8)).await.unwrap();
    assert_eq!(p.processor.cleanup(7).await.unwrap(), 1);
}

#[tokio::test]
async fn cleanup_rejects_out_of_range_windows() {
    let p = pipeline();
    for days in [-1, 1_000_000_000_000, i64::MAX] {
        let err = p.processor.cleanup(days).await.unwrap_err();
        assert!(matches!(err, AutomationError::InvalidRetention(d) if d == days), "{days}");
    }
    assert_eq!(p.processor.cleanup(0).await.unwrap(), 0);
}

// ============================================================
// Manual retry and engagement
// ============================================================

#[tokio::test]
async fn retry_post_requeues_at_high_priority() {
    let p = pipeline();
    let article = fitness_article();
    p.store.record_post(&PostRecord::failed(article.id, Platform::Facebook, "boom")).await.unwrap();
    let post_id = p.store.posts.lock().unwrap()[0].id;

    let item = p.processor.retry_post(post_id).await.unwrap();
    assert_eq!(item.priority, 10);
    assert_eq!(item.platform, Platform::Facebook);
    assert_close(item.scheduled_for, Utc::now());

    let (record, _, retries) = p.store.post_for(article.id, Platform::Facebook).unwrap();
    assert_eq!(record.status, PostStatus::Pending);
    assert_eq!(retries, 1);

    let err = p.processor.retry_post(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AutomationError::PostNotFound(_)));
}

#[tokio::test]
async fn engagement_sync_stores_metrics_for_recent_posts() {
    let p = pipeline();
    let metrics = EngagementMetrics { likes: 12, shares: 3, comments: 4, ..Default::default() };
    p.resolver
        .registry()
        .insert(Arc::new(MockPublisher::succeeding(Platform::Reddit).with_engagement(metrics.clone())))
        .await;

    let article = fitness_article();
    p.store.add_article(article.clone());
    queue_now(&p, &article, Platform::Reddit).await;
    p.processor.process_due().await.unwrap();

    let stale = Uuid::new_v4();
    p.store
        .record_post(&PostRecord {
            article_id: stale,
            platform: Platform::Reddit,
            status: PostStatus::Posted,
            post_id: Some("old".into()),
            posted_at: Some(Utc::now() - Duration::days(8)),
            error_message: None,
            ..PostRecord::failed(stale, Platform::Reddit, "")
        })
        .await
        .unwrap();

    let sync = EngagementSync::new(p.store.clone(), p.resolver.clone());
    let summary = sync.sync().await.unwrap();
    assert_eq!(summary.synced, 1);
    assert_eq!(summary.failed, 0);

    let saved = p.store.engagement.lock().unwrap();
    assert_eq!(saved.values().next(), Some(&metrics));
}

// ============================================================
// Controller
// ============================================================

#[tokio::test(start_paused = true)]
async fn controller_starts_once_and_stops() {
    let p = pipeline();
    let sync = Arc::new(EngagementSync::new(p.store.clone(), p.resolver.clone()));
    let controller = AutomationController::new(p.detector.clone(), p.processor.clone(), sync);

    let status = controller.detector_status().await;
    assert!(!status.is_running);
    assert!(status.next_check_time.is_none());

    let interval = StdDuration::from_secs(300);
    assert_eq!(controller.start(interval, StdDuration::from_secs(60)).await, StartOutcome::Started);
    assert_eq!(controller.start(interval, StdDuration::from_secs(60)).await, StartOutcome::AlreadyRunning);

    let status = controller.detector_status().await;
    assert!(status.is_running);
    assert_eq!(status.next_check_time, Some(status.last_check_time + Duration::minutes(5)));

    tokio::time::advance(StdDuration::from_secs(120)).await;

    assert!(controller.stop().await);
    assert!(!controller.is_running().await);
    assert!(!controller.stop().await);
}

#[tokio::test(start_paused = true)]
async fn controller_start_runs_an_immediate_pass() {
    let p = pipeline();
    p.store.add_article(fitness_article());
    p.store.rules.lock().unwrap().push(all_platforms_rule());
    *p.store.active.lock().unwrap() = vec![Platform::Reddit];
    let sync = Arc::new(EngagementSync::new(p.store.clone(), p.resolver.clone()));
    let controller = AutomationController::new(p.detector.clone(), p.processor.clone(), sync);

    controller.start(StdDuration::from_secs(300), StdDuration::from_secs(60)).await;
    assert_eq!(p.queue.all().await.len(), 1);
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn status_answers_while_the_first_pass_runs() {
    let p = pipeline();
    let article = fitness_article();
    p.store.add_article(article.clone());
    let slow = MockPublisher::succeeding(Platform::Reddit).with_delay(StdDuration::from_secs(30));
    p.resolver.registry().insert(Arc::new(slow)).await;
    queue_now(&p, &article, Platform::Reddit).await;

    let sync = Arc::new(EngagementSync::new(p.store.clone(), p.resolver.clone()));
    let controller = Arc::new(AutomationController::new(p.detector.clone(), p.processor.clone(), sync));
    let starting = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start(StdDuration::from_secs(300), StdDuration::from_secs(60)).await })
    };

    for _ in 0..100 {
        if p.processor.is_processing() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(p.processor.is_processing());

    let status = tokio::time::timeout(StdDuration::from_secs(1), controller.detector_status())
        .await
        .expect("status must not wait for the first pass");
    assert!(status.is_running);

    assert_eq!(starting.await.unwrap(), StartOutcome::Started);
    assert_eq!(p.queue.stats().await.unwrap().completed, 1);
    assert!(controller.stop().await);
}

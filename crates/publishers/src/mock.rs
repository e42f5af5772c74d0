//! `MockPublisher` — a test double for `SocialPublisher`.
//!
//! Used by the automation pipeline tests in place of the real platform clients.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

use crate::{EngagementMetrics, Platform, PostReceipt, PublishError, RateLimit, SocialContent, SocialPublisher};

/// Behaviour injected into `MockPublisher` at construction time.
pub enum MockBehaviour {
    /// Every post succeeds.
    Succeed,
    /// The first `n` posts fail with a `Retryable` error, later ones succeed.
    FailRetryableTimes(usize),
    /// Fail with a `Retryable` error.
    FailRetryable(String),
    /// Fail with a `Fatal` error.
    FailFatal(String),
}

/// A mock publisher that records every post it receives.
pub struct MockPublisher {
    pub platform: Platform,
    pub behaviour: MockBehaviour,
    /// Remaining calls reported by `rate_limit`.
    pub remaining: u32,
    pub engagement: EngagementMetrics,
    /// Time each `post` call takes before it answers.
    pub delay: Option<std::time::Duration>,
    /// All content seen by this publisher (in call order).
    pub calls: Arc<Mutex<Vec<SocialContent>>>,
}

impl MockPublisher {
    fn with(platform: Platform, behaviour: MockBehaviour) -> Self {
        Self {
            platform,
            behaviour,
            remaining: 100,
            engagement: EngagementMetrics::default(),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock whose posts always succeed.
    pub fn succeeding(platform: Platform) -> Self {
        Self::with(platform, MockBehaviour::Succeed)
    }

    /// Create a mock that always fails with a `Retryable` error.
    pub fn failing_retryable(platform: Platform, msg: impl Into<String>) -> Self {
        Self::with(platform, MockBehaviour::FailRetryable(msg.into()))
    }

    /// Create a mock that always fails with a `Fatal` error.
    pub fn failing_fatal(platform: Platform, msg: impl Into<String>) -> Self {
        Self::with(platform, MockBehaviour::FailFatal(msg.into()))
    }

    /// Create a mock that fails `n` times before it starts succeeding.
    pub fn flaky(platform: Platform, n: usize) -> Self {
        Self::with(platform, MockBehaviour::FailRetryableTimes(n))
    }

    pub fn with_remaining(mut self, remaining: u32) -> Self {
        self.remaining = remaining;
        self
    }

    pub fn with_engagement(mut self, engagement: EngagementMetrics) -> Self {
        self.engagement = engagement;
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `post` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SocialPublisher for MockPublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn post(&self, content: &SocialContent) -> Result<PostReceipt, PublishError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(content.clone());
            calls.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behaviour {
            MockBehaviour::Succeed => {}
            MockBehaviour::FailRetryableTimes(times) if n <= *times => {
                return Err(PublishError::Retryable(format!("transient failure {n}")));
            }
            MockBehaviour::FailRetryableTimes(_) => {}
            MockBehaviour::FailRetryable(msg) => return Err(PublishError::Retryable(msg.clone())),
            MockBehaviour::FailFatal(msg)     => return Err(PublishError::Fatal(msg.clone())),
        }

        let post_id = format!("{}-{n}", self.platform);
        Ok(PostReceipt { post_url: format!("https://{}.example/{post_id}", self.platform), post_id })
    }

    async fn delete_post(&self, _post_id: &str) -> Result<bool, PublishError> {
        Ok(true)
    }

    async fn engagement(&self, _post_id: &str) -> Result<EngagementMetrics, PublishError> {
        Ok(self.engagement.clone())
    }

    async fn validate_credentials(&self) -> Result<bool, PublishError> {
        Ok(!matches!(self.behaviour, MockBehaviour::FailFatal(_)))
    }

    async fn rate_limit(&self) -> Result<RateLimit, PublishError> {
        Ok(RateLimit { remaining: self.remaining, reset: Utc::now() + Duration::minutes(15) })
    }
}

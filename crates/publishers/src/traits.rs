//! The `SocialPublisher` trait — the contract every platform client must fulfil.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Platform, PublishError};

/// The article fields the formatter needs.
///
/// Defined here (in the publishers crate) so both the automation crate and
/// the formatter can use it without a circular dependency.
#[derive(Debug, Clone, Default)]
pub struct PostSource {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
}

/// Platform-ready content for a single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialContent {
    pub text: String,
    pub hashtags: Vec<String>,
    pub media_url: Option<String>,
    pub link: String,
}

/// What the platform handed back after a successful post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReceipt {
    pub post_id: String,
    pub post_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub likes: i64,
    pub shares: i64,
    pub comments: i64,
    pub views: Option<i64>,
    pub reach: Option<i64>,
    pub engagement_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub remaining: u32,
    pub reset: DateTime<Utc>,
}

impl RateLimit {
    /// A limit we know nothing about; assume there is room.
    pub fn unknown() -> Self {
        Self { remaining: u32::MAX, reset: Utc::now() }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// The core publisher trait.
///
/// All platform clients and test doubles implement this.
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    fn platform(&self) -> Platform;

    /// Publish `content` and return the platform's id and URL for it.
    async fn post(&self, content: &SocialContent) -> Result<PostReceipt, PublishError>;

    async fn delete_post(&self, post_id: &str) -> Result<bool, PublishError>;

    async fn engagement(&self, post_id: &str) -> Result<EngagementMetrics, PublishError>;

    async fn validate_credentials(&self) -> Result<bool, PublishError>;

    async fn rate_limit(&self) -> Result<RateLimit, PublishError>;
}

//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types live in the `queue`, `publishers` and `automation` crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// articles
// ---------------------------------------------------------------------------

/// Editorial status of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Draft,
    Published,
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft     => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

impl std::str::FromStr for ArticleStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft"     => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other       => Err(format!("unknown article status: {other}")),
        }
    }
}

/// A persisted article row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArticleRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    /// Category slug (`categories.id`).
    pub category: String,
    pub status: String,
    pub featured_image: Option<String>,
    pub tags: Vec<String>,
    pub author: String,
    pub featured: bool,
    pub trending: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl ArticleRow {
    pub fn is_published(&self) -> bool {
        self.status == "published"
    }
}

/// Values for inserting a new article. Slug uniqueness is the caller's job.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub category: String,
    pub status: ArticleStatus,
    pub featured_image: Option<String>,
    pub tags: Vec<String>,
    pub author: String,
    pub featured: bool,
    pub trending: bool,
}

/// Filter + pagination for the admin article listing.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub status: Option<ArticleStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Projection returned by the bulk category update.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArticleCategoryRow {
    pub id: Uuid,
    pub title: String,
    pub category: String,
}

// ---------------------------------------------------------------------------
// categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// A category together with the number of published articles in it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryCountRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub article_count: i64,
}

// ---------------------------------------------------------------------------
// site_settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SettingRow {
    pub key: String,
    pub value: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// social_platforms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlatformRow {
    pub platform: String,
    pub is_active: bool,
    /// Platform API credentials; never serialised to public callers.
    #[serde(skip_serializing)]
    pub credentials: Option<serde_json::Value>,
    pub last_posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// social_automation_rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RuleRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub rule_type: String,
    /// JSON-encoded rule conditions (categories, keywords, word counts, …)
    pub conditions: serde_json::Value,
    pub platforms: Vec<String>,
    pub is_active: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub description: Option<String>,
    pub rule_type: String,
    pub conditions: serde_json::Value,
    pub platforms: Vec<String>,
    pub is_active: bool,
    pub priority: i32,
}

// ---------------------------------------------------------------------------
// social_schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduleRow {
    pub id: Uuid,
    pub platform: String,
    /// 0 = Sunday … 6 = Saturday.
    pub day_of_week: i32,
    pub hour: i32,
    pub minute: i32,
    pub timezone: String,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// social_post_queue
// ---------------------------------------------------------------------------

/// A queue row. `status` is one of `pending`, `processing`, `completed`, `failed`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueueItemRow {
    pub id: Uuid,
    pub article_id: Uuid,
    pub platform: String,
    pub priority: i32,
    pub status: String,
    pub attempts: i32,
    pub scheduled_for: DateTime<Utc>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StatusCountRow {
    pub status: String,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// social_posts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SocialPostRow {
    pub id: Uuid,
    pub article_id: Uuid,
    pub platform: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub hashtags: Vec<String>,
    pub post_id: Option<String>,
    pub post_url: Option<String>,
    pub short_url: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Upsert payload for `social_posts`, keyed on `(article_id, platform)`.
#[derive(Debug, Clone, Default)]
pub struct SocialPostUpsert {
    pub article_id: Uuid,
    pub platform: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub hashtags: Vec<String>,
    pub post_id: Option<String>,
    pub post_url: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// social_clicks / social_engagement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewClick {
    pub social_post_id: Uuid,
    pub short_code: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub device_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EngagementRow {
    pub social_post_id: Uuid,
    pub likes: i64,
    pub shares: i64,
    pub comments: i64,
    pub views: Option<i64>,
    pub reach: Option<i64>,
    pub engagement_rate: Option<f64>,
    pub synced_at: DateTime<Utc>,
}

/// Per-platform aggregate used by the analytics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlatformAnalyticsRow {
    pub platform: String,
    pub posted: i64,
    pub pending: i64,
    pub failed: i64,
    pub clicks: i64,
    pub likes: i64,
    pub shares: i64,
    pub comments: i64,
}

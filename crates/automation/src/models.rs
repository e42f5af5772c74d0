//! Domain models for the automation pipeline.
//!
//! Row structs from the `db` crate are converted into these at the store
//! boundary; nothing past the store sees a raw status string.

use chrono::{DateTime, Utc};
use publishers::{Platform, PostSource};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AutomationError;

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// The article fields the pipeline reads.
#[derive(Debug, Clone, Default)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    pub featured: bool,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Whitespace-separated tokens in the body.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    pub fn has_image(&self) -> bool {
        self.featured_image.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    pub fn to_source(&self) -> PostSource {
        PostSource {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            excerpt: self.excerpt.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            featured_image: self.featured_image.clone(),
        }
    }
}

impl From<db::models::ArticleRow> for Article {
    fn from(row: db::models::ArticleRow) -> Self {
        Self {
            published: row.is_published(),
            id: row.id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            content: row.content,
            category: row.category,
            tags: row.tags,
            featured_image: row.featured_image,
            featured: row.featured,
            published_at: row.published_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Automation rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    CategoryBased,
    KeywordBased,
    TimeBased,
    EngagementBased,
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CategoryBased   => write!(f, "category_based"),
            Self::KeywordBased    => write!(f, "keyword_based"),
            Self::TimeBased       => write!(f, "time_based"),
            Self::EngagementBased => write!(f, "engagement_based"),
        }
    }
}

impl std::str::FromStr for RuleType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category_based"   => Ok(Self::CategoryBased),
            "keyword_based"    => Ok(Self::KeywordBased),
            "time_based"       => Ok(Self::TimeBased),
            "engagement_based" => Ok(Self::EngagementBased),
            other              => Err(format!("unknown rule type: {other}")),
        }
    }
}

/// Conditions stored in the rule's JSONB column. Absent means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_image: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_engagement: Option<i64>,
    /// Hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_since_last_post: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub rule_type: RuleType,
    pub conditions: RuleConditions,
    pub platforms: Vec<Platform>,
    pub is_active: bool,
    pub priority: i32,
}

impl TryFrom<db::models::RuleRow> for AutomationRule {
    type Error = AutomationError;

    fn try_from(row: db::models::RuleRow) -> Result<Self, Self::Error> {
        let invalid = |msg: String| AutomationError::InvalidRule(format!("{}: {msg}", row.name));

        let rule_type = row.rule_type.parse().map_err(invalid)?;
        let conditions = serde_json::from_value(row.conditions.clone()).map_err(|e| invalid(e.to_string()))?;
        let platforms = row
            .platforms
            .iter()
            .map(|p| p.parse::<Platform>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            rule_type,
            conditions,
            platforms,
            is_active: row.is_active,
            priority: row.priority,
        })
    }
}

/// Create/update payload for a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAutomationRule {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rule_type: RuleType,
    #[serde(default)]
    pub conditions: RuleConditions,
    pub platforms: Vec<Platform>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub priority: i32,
}

fn default_true() -> bool {
    true
}

impl NewAutomationRule {
    pub fn to_row(&self) -> Result<db::models::NewRule, AutomationError> {
        Ok(db::models::NewRule {
            name: self.name.clone(),
            description: self.description.clone(),
            rule_type: self.rule_type.to_string(),
            conditions: serde_json::to_value(&self.conditions)
                .map_err(|e| AutomationError::InvalidRule(e.to_string()))?,
            platforms: self.platforms.iter().map(|p| p.to_string()).collect(),
            is_active: self.is_active,
            priority: self.priority,
        })
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// A weekly posting slot, read as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduleSlot {
    /// 0 = Sunday … 6 = Saturday.
    pub day_of_week: u32,
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleSlot {
    pub fn new(day_of_week: u32, hour: u32, minute: u32) -> Self {
        Self { day_of_week, hour, minute }
    }
}

// ---------------------------------------------------------------------------
// Social posts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    Posted,
    Failed,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Posted  => write!(f, "posted"),
            Self::Failed  => write!(f, "failed"),
        }
    }
}

/// The outcome of a posting attempt, written to `social_posts`.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub article_id: Uuid,
    pub platform: Platform,
    pub status: PostStatus,
    pub content: String,
    pub media_urls: Vec<String>,
    pub hashtags: Vec<String>,
    pub post_id: Option<String>,
    pub post_url: Option<String>,
    pub error_message: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl PostRecord {
    /// A `failed` record carrying only the error.
    pub fn failed(article_id: Uuid, platform: Platform, error: impl Into<String>) -> Self {
        Self {
            article_id,
            platform,
            status: PostStatus::Failed,
            content: String::new(),
            media_urls: Vec::new(),
            hashtags: Vec::new(),
            post_id: None,
            post_url: None,
            error_message: Some(error.into()),
            posted_at: None,
        }
    }

    pub fn to_upsert(&self) -> db::models::SocialPostUpsert {
        db::models::SocialPostUpsert {
            article_id: self.article_id,
            platform: self.platform.to_string(),
            content: self.content.clone(),
            media_urls: self.media_urls.clone(),
            hashtags: self.hashtags.clone(),
            post_id: self.post_id.clone(),
            post_url: self.post_url.clone(),
            status: self.status.to_string(),
            error_message: self.error_message.clone(),
            posted_at: self.posted_at,
        }
    }
}

/// Identifies a stored social post and where it lives on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    pub id: Uuid,
    pub article_id: Uuid,
    pub platform: Platform,
    pub post_id: Option<String>,
}

impl TryFrom<db::models::SocialPostRow> for PostRef {
    type Error = AutomationError;

    fn try_from(row: db::models::SocialPostRow) -> Result<Self, Self::Error> {
        let platform = row
            .platform
            .parse()
            .map_err(|e: String| AutomationError::Store(format!("post {}: {e}", row.id)))?;
        Ok(Self { id: row.id, article_id: row.article_id, platform, post_id: row.post_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule_row(rule_type: &str, platforms: &[&str]) -> db::models::RuleRow {
        db::models::RuleRow {
            id: Uuid::new_v4(),
            name: "r".into(),
            description: None,
            rule_type: rule_type.into(),
            conditions: json!({ "categories": ["fitness"], "min_word_count": 500 }),
            platforms: platforms.iter().map(|p| p.to_string()).collect(),
            is_active: true,
            priority: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rule_rows_decode_into_typed_rules() {
        let rule = AutomationRule::try_from(rule_row("category_based", &["reddit", "twitter"])).unwrap();
        assert_eq!(rule.rule_type, RuleType::CategoryBased);
        assert_eq!(rule.platforms, vec![Platform::Reddit, Platform::Twitter]);
        assert_eq!(rule.conditions.min_word_count, Some(500));
        assert_eq!(rule.conditions.keywords, None);
    }

    #[test]
    fn unknown_platform_or_type_is_invalid() {
        assert!(AutomationRule::try_from(rule_row("category_based", &["myspace"])).is_err());
        assert!(AutomationRule::try_from(rule_row("vibes_based", &["reddit"])).is_err());
    }

    #[test]
    fn new_rule_payload_defaults() {
        let rule: NewAutomationRule = serde_json::from_value(json!({
            "name": "All fitness",
            "rule_type": "category_based",
            "platforms": ["facebook"]
        }))
        .unwrap();
        assert!(rule.is_active);
        assert_eq!(rule.priority, 0);

        let row = rule.to_row().unwrap();
        assert_eq!(row.rule_type, "category_based");
        assert_eq!(row.conditions, json!({}));
        assert_eq!(row.platforms, vec!["facebook"]);
    }

    #[test]
    fn word_count_splits_on_any_whitespace() {
        let article = Article { content: "one  two\nthree\tfour ".into(), ..Default::default() };
        assert_eq!(article.word_count(), 4);
    }
}

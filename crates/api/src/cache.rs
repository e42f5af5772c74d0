//! In-process snapshot of published articles.
//!
//! Public reads are served from the snapshot. It loads on first use, reloads
//! once older than the TTL, and is swapped whole under a write lock so
//! readers never observe a partial load.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use db::models::ArticleRow;
use db::repository::articles;
use db::{DbError, DbPool};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

struct Snapshot {
    articles: Arc<Vec<ArticleRow>>,
    loaded_at: Instant,
}

pub struct ArticleCache {
    pool: DbPool,
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
}

impl ArticleCache {
    pub fn new(pool: DbPool, ttl: Duration) -> Self {
        Self { pool, ttl, snapshot: RwLock::new(None) }
    }

    /// All published articles, newest first.
    pub async fn published(&self) -> Result<Arc<Vec<ArticleRow>>, DbError> {
        if let Some(articles) = self.fresh().await {
            return Ok(articles);
        }
        self.reload().await
    }

    /// Load from the database and swap the snapshot in.
    pub async fn reload(&self) -> Result<Arc<Vec<ArticleRow>>, DbError> {
        let rows = articles::list_published(&self.pool).await?;
        info!(articles = rows.len(), "article cache loaded");
        Ok(self.replace(rows).await)
    }

    /// Drop the snapshot; the next read reloads.
    pub async fn clear(&self) {
        if self.snapshot.write().await.take().is_some() {
            debug!("article cache cleared");
        }
    }

    async fn fresh(&self) -> Option<Arc<Vec<ArticleRow>>> {
        let guard = self.snapshot.read().await;
        let snapshot = guard.as_ref()?;
        (snapshot.loaded_at.elapsed() < self.ttl).then(|| snapshot.articles.clone())
    }

    async fn replace(&self, rows: Vec<ArticleRow>) -> Arc<Vec<ArticleRow>> {
        let articles = Arc::new(rows);
        *self.snapshot.write().await = Some(Snapshot { articles: articles.clone(), loaded_at: Instant::now() });
        articles
    }
}

// ---------------------------------------------------------------------------
// Queries over a snapshot
// ---------------------------------------------------------------------------

pub fn in_category<'a>(articles: &'a [ArticleRow], category: Option<&str>, limit: usize) -> Vec<&'a ArticleRow> {
    articles
        .iter()
        .filter(|a| category.map_or(true, |c| a.category == c))
        .take(limit)
        .collect()
}

pub fn featured(articles: &[ArticleRow], limit: usize) -> Vec<&ArticleRow> {
    articles.iter().filter(|a| a.featured).take(limit).collect()
}

pub fn trending(articles: &[ArticleRow], limit: usize) -> Vec<&ArticleRow> {
    articles.iter().filter(|a| a.trending).take(limit).collect()
}

pub fn by_slug<'a>(articles: &'a [ArticleRow], slug: &str) -> Option<&'a ArticleRow> {
    articles.iter().find(|a| a.slug == slug)
}

/// Case-insensitive match on title, excerpt or tags.
///
/// Title hits rank above excerpt hits, which rank above tag hits; ties keep
/// snapshot order (newest first).
pub fn search<'a>(articles: &'a [ArticleRow], query: &str, limit: usize) -> Vec<&'a ArticleRow> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<(u8, &ArticleRow)> = articles
        .iter()
        .filter_map(|a| {
            let score = if a.title.to_lowercase().contains(&needle) {
                3
            } else if a.excerpt.to_lowercase().contains(&needle) {
                2
            } else if a.tags.iter().any(|t| t.to_lowercase().contains(&needle)) {
                1
            } else {
                return None;
            };
            Some((score, a))
        })
        .collect();

    hits.sort_by(|a, b| b.0.cmp(&a.0));
    hits.into_iter().take(limit).map(|(_, a)| a).collect()
}

/// Published-article count per category slug.
pub fn category_counts(articles: &[ArticleRow]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for article in articles {
        *counts.entry(article.category.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use uuid::Uuid;

    pub(crate) fn article(title: &str, category: &str) -> ArticleRow {
        let now = Utc::now();
        ArticleRow {
            id: Uuid::new_v4(),
            title: title.into(),
            slug: title.to_lowercase().replace(' ', "-"),
            content: "body".into(),
            excerpt: String::new(),
            category: category.into(),
            status: "published".into(),
            featured_image: None,
            tags: Vec::new(),
            author: "Editorial Team".into(),
            featured: false,
            trending: false,
            created_at: now,
            updated_at: now,
            published_at: Some(now - ChronoDuration::minutes(1)),
        }
    }

    fn cache(ttl: Duration) -> ArticleCache {
        let pool = db::pool::create_lazy_pool("postgres://localhost/newsroom_test").unwrap();
        ArticleCache::new(pool, ttl)
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_expires_after_ttl() {
        let cache = cache(Duration::from_secs(300));
        assert!(cache.fresh().await.is_none());

        cache.replace(vec![article("Squats", "fitness")]).await;
        assert_eq!(cache.fresh().await.unwrap().len(), 1);
        assert_eq!(cache.published().await.unwrap().len(), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(cache.fresh().await.is_none());
    }

    #[tokio::test]
    async fn clear_drops_snapshot() {
        let cache = cache(Duration::from_secs(300));
        cache.replace(vec![article("Squats", "fitness")]).await;
        cache.clear().await;
        assert!(cache.fresh().await.is_none());
    }

    #[test]
    fn search_ranks_title_over_excerpt_over_tags() {
        let mut by_tag = article("Morning routine", "health");
        by_tag.tags = vec!["Protein".into()];
        let mut by_excerpt = article("Breakfast ideas", "nutrition");
        by_excerpt.excerpt = "High protein oats".into();
        let by_title = article("Protein myths", "nutrition");
        let unrelated = article("Leg day", "fitness");
        let all = vec![by_tag, by_excerpt, by_title, unrelated];

        let titles: Vec<&str> = search(&all, "PROTEIN", 10).iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Protein myths", "Breakfast ideas", "Morning routine"]);
        assert!(search(&all, "  ", 10).is_empty());
    }

    #[test]
    fn filters_and_counts() {
        let mut hero = article("Hero", "fitness");
        hero.featured = true;
        let mut hot = article("Hot", "style");
        hot.trending = true;
        let all = vec![hero, hot, article("Plain", "fitness")];

        assert_eq!(in_category(&all, Some("fitness"), 10).len(), 2);
        assert_eq!(in_category(&all, None, 1).len(), 1);
        assert_eq!(featured(&all, 10)[0].title, "Hero");
        assert_eq!(trending(&all, 10)[0].title, "Hot");
        assert_eq!(by_slug(&all, "plain").unwrap().title, "Plain");

        let counts = category_counts(&all);
        assert_eq!(counts.get("fitness"), Some(&2));
        assert_eq!(counts.get("style"), Some(&1));
    }
}

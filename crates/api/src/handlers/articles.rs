use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use db::models::{ArticleFilter, ArticleRow, ArticleStatus, NewArticle};
use db::repository::articles as article_repo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::slugify;
use crate::cache;
use crate::{ApiError, ApiJson, AppState};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_SLUG_LEN: usize = 200;
pub const EXCERPT_LEN: usize = 160;
pub const DEFAULT_CATEGORY: &str = "health";
pub const DEFAULT_AUTHOR: &str = "Editorial Team";

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateArticleDto {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub trending: bool,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateArticleDto {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub status: Option<ArticleStatus>,
    pub featured_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub author: Option<String>,
    pub featured: Option<bool>,
    pub trending: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ArticleStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct ArticlePage {
    pub articles: Vec<ArticleRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct PublicListQuery {
    pub category: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Row offset of a 1-based `page`.
fn page_offset(page: i64, limit: i64) -> Result<i64, ApiError> {
    (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| ApiError::bad_request("page is out of range"))
}

/// `ceil(total / limit)`; zero when there is nothing to show.
fn page_count(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total - 1) / limit + 1
    }
}

/// The `n`th slug to try: `base` itself, then `base-1`, `base-2`, ...
/// The base is shortened so the result stays within `MAX_SLUG_LEN`.
fn slug_candidate(base: &str, n: u32) -> String {
    if n == 0 {
        return base.to_owned();
    }
    let suffix = format!("-{n}");
    let keep = MAX_SLUG_LEN.saturating_sub(suffix.len());
    let head: String = base.chars().take(keep).collect();
    format!("{}{suffix}", head.trim_end_matches('-'))
}

/// The first 160 characters of `content`, followed by `...`.
pub fn default_excerpt(content: &str) -> String {
    let head: String = content.chars().take(EXCERPT_LEN).collect();
    format!("{}...", head.trim_end())
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    let len = title.trim().chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!("Title must be 1-{MAX_TITLE_LEN} characters")));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> Result<(), ApiError> {
    let len = slug.chars().count();
    if len == 0 || len > MAX_SLUG_LEN {
        return Err(ApiError::bad_request(format!("Slug must be 1-{MAX_SLUG_LEN} characters")));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::bad_request("Content is required"));
    }
    Ok(())
}

/// `base`, or `base-1`, `base-2`, ... whichever is free first.
async fn unique_slug(state: &AppState, base: &str) -> Result<String, ApiError> {
    let mut n = 0;
    let mut candidate = slug_candidate(base, n);
    while article_repo::slug_exists(&state.pool, &candidate, None).await? {
        n += 1;
        candidate = slug_candidate(base, n);
    }
    Ok(candidate)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

pub async fn list_admin(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<ArticlePage>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = clamp_limit(query.limit);
    let filter = ArticleFilter {
        status: query.status,
        category: non_empty(query.category),
        search: non_empty(query.search),
        limit,
        offset: page_offset(page, limit)?,
    };

    let articles = article_repo::list_articles(&state.pool, &filter).await?;
    let total = article_repo::count_articles(&state.pool, &filter).await?;

    Ok(Json(ArticlePage {
        articles,
        pagination: Pagination { page, limit, total, pages: page_count(total, limit) },
    }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ArticleRow>, ApiError> {
    match article_repo::get_article(&state.pool, id).await {
        Ok(article) => Ok(Json(article)),
        Err(db::DbError::NotFound) => Err(ApiError::not_found("Article")),
        Err(e) => Err(e.into()),
    }
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateArticleDto>,
) -> Result<(StatusCode, Json<ArticleRow>), ApiError> {
    validate_title(&payload.title)?;
    validate_content(&payload.content)?;
    let base = match non_empty(payload.slug) {
        Some(slug) => slug,
        None => slugify(&payload.title),
    };
    validate_slug(&base)?;
    let slug = unique_slug(&state, &base).await?;

    let article = NewArticle {
        title: payload.title.trim().to_owned(),
        excerpt: non_empty(payload.excerpt).unwrap_or_else(|| default_excerpt(&payload.content)),
        content: payload.content,
        slug,
        category: non_empty(payload.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
        status: payload.status.unwrap_or(ArticleStatus::Draft),
        featured_image: non_empty(payload.featured_image),
        tags: payload.tags,
        author: non_empty(payload.author).unwrap_or_else(|| DEFAULT_AUTHOR.to_owned()),
        featured: payload.featured,
        trending: payload.trending,
    };

    let created = article_repo::create_article(&state.pool, &article).await?;
    state.cache.clear().await;
    info!(id = %created.id, slug = %created.slug, "article created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateArticleDto>,
) -> Result<Json<ArticleRow>, ApiError> {
    let mut article = match article_repo::get_article(&state.pool, id).await {
        Ok(article) => article,
        Err(db::DbError::NotFound) => return Err(ApiError::not_found("Article")),
        Err(e) => return Err(e.into()),
    };
    let was_published = article.is_published();

    if let Some(title) = payload.title {
        validate_title(&title)?;
        article.title = title.trim().to_owned();
    }
    if let Some(slug) = payload.slug {
        let slug = slug.trim().to_owned();
        validate_slug(&slug)?;
        if slug != article.slug && article_repo::slug_exists(&state.pool, &slug, Some(id)).await? {
            return Err(ApiError::Conflict(format!("Slug '{slug}' is already in use")));
        }
        article.slug = slug;
    }
    if let Some(content) = payload.content {
        validate_content(&content)?;
        article.content = content;
    }
    if let Some(excerpt) = payload.excerpt {
        article.excerpt = excerpt;
    }
    if let Some(category) = non_empty(payload.category) {
        article.category = category;
    }
    if let Some(status) = payload.status {
        article.status = status.to_string();
    }
    if let Some(image) = payload.featured_image {
        article.featured_image = Some(image).filter(|i| !i.is_empty());
    }
    if let Some(tags) = payload.tags {
        article.tags = tags;
    }
    if let Some(author) = non_empty(payload.author) {
        article.author = author;
    }
    if let Some(featured) = payload.featured {
        article.featured = featured;
    }
    if let Some(trending) = payload.trending {
        article.trending = trending;
    }

    if !was_published && article.is_published() && article.published_at.is_none() {
        article.published_at = Some(Utc::now());
    }

    let updated = article_repo::update_article(&state.pool, &article).await?;
    state.cache.clear().await;
    info!(%id, "article updated");
    Ok(Json(updated))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    match article_repo::delete_article(&state.pool, id).await {
        Ok(()) => {
            state.cache.clear().await;
            info!(%id, "article deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(db::DbError::NotFound) => Err(ApiError::not_found("Article")),
        Err(e) => Err(e.into()),
    }
}

pub async fn refresh_cache(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.cache.clear().await;
    let articles = state.cache.reload().await?;
    Ok(Json(json!({
        "success": true,
        "articlesLoaded": articles.len(),
        "categories": cache::category_counts(&articles),
    })))
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

pub async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<PublicListQuery>,
) -> Result<Json<Value>, ApiError> {
    let articles = state.cache.published().await?;
    let found = cache::in_category(&articles, query.category.as_deref(), clamp_limit(query.limit) as usize);
    Ok(Json(json!({ "articles": found, "count": found.len() })))
}

pub async fn featured(
    State(state): State<AppState>,
    Query(query): Query<PublicListQuery>,
) -> Result<Json<Value>, ApiError> {
    let articles = state.cache.published().await?;
    let found = cache::featured(&articles, clamp_limit(query.limit) as usize);
    Ok(Json(json!({ "articles": found, "count": found.len() })))
}

pub async fn trending(
    State(state): State<AppState>,
    Query(query): Query<PublicListQuery>,
) -> Result<Json<Value>, ApiError> {
    let articles = state.cache.published().await?;
    let found = cache::trending(&articles, clamp_limit(query.limit) as usize);
    Ok(Json(json!({ "articles": found, "count": found.len() })))
}

pub async fn by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<ArticleRow>, ApiError> {
    let articles = state.cache.published().await?;
    cache::by_slug(&articles, &slug)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Article"))
}

pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Result<Json<Value>, ApiError> {
    let q = non_empty(query.q).ok_or_else(|| ApiError::bad_request("Search query is required"))?;
    let articles = state.cache.published().await?;
    let results = cache::search(&articles, &q, clamp_limit(query.limit) as usize);
    Ok(Json(json!({ "results": results, "total": results.len(), "query": q })))
}

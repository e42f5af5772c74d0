//! Article CRUD operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{ArticleCategoryRow, ArticleFilter, ArticleRow, ArticleStatus, NewArticle},
};

const ARTICLE_COLUMNS: &str = "id, title, slug, content, excerpt, category, status, featured_image, \
     tags, author, featured, trending, created_at, updated_at, published_at";

/// Insert a new article.
///
/// `published_at` is stamped when the article is created as `published`.
pub async fn create_article(pool: &PgPool, article: &NewArticle) -> Result<ArticleRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let published_at = (article.status == ArticleStatus::Published).then_some(now);

    let sql = format!(
        r#"
        INSERT INTO articles
            (id, title, slug, content, excerpt, category, status, featured_image,
             tags, author, featured, trending, created_at, updated_at, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13, $14)
        RETURNING {ARTICLE_COLUMNS}
        "#
    );

    sqlx::query_as::<_, ArticleRow>(&sql)
        .bind(id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.content)
        .bind(&article.excerpt)
        .bind(&article.category)
        .bind(article.status.to_string())
        .bind(&article.featured_image)
        .bind(&article.tags)
        .bind(&article.author)
        .bind(article.featured)
        .bind(article.trending)
        .bind(now)
        .bind(published_at)
        .fetch_one(pool)
        .await
        .map_err(DbError::from_write)
}

/// Whether `slug` is already used, optionally ignoring the article `except`.
pub async fn slug_exists(pool: &PgPool, slug: &str, except: Option<Uuid>) -> Result<bool, DbError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM articles WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(slug)
    .bind(except)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Fetch a single article by its primary key.
pub async fn get_article(pool: &PgPool, id: Uuid) -> Result<ArticleRow, DbError> {
    let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
    sqlx::query_as::<_, ArticleRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Fetch an article only if it is published.
pub async fn get_published_article(pool: &PgPool, id: Uuid) -> Result<Option<ArticleRow>, DbError> {
    let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 AND status = 'published'");
    let row = sqlx::query_as::<_, ArticleRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR status = $1)
      AND ($2::text IS NULL OR category = $2)
      AND ($3::text IS NULL
           OR title ILIKE $3 ESCAPE '\'
           OR content ILIKE $3 ESCAPE '\')
"#;

/// `%term%` with the LIKE metacharacters in `term` escaped, so the search is
/// a plain substring match.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// One page of articles matching `filter`, newest first.
pub async fn list_articles(pool: &PgPool, filter: &ArticleFilter) -> Result<Vec<ArticleRow>, DbError> {
    let sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles {FILTER_CLAUSE} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
    );

    let rows = sqlx::query_as::<_, ArticleRow>(&sql)
        .bind(filter.status.map(|s| s.to_string()))
        .bind(&filter.category)
        .bind(filter.search.as_deref().map(contains_pattern))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Total number of articles matching `filter` (pagination is ignored).
pub async fn count_articles(pool: &PgPool, filter: &ArticleFilter) -> Result<i64, DbError> {
    let sql = format!("SELECT COUNT(*) FROM articles {FILTER_CLAUSE}");

    let total: i64 = sqlx::query_scalar(&sql)
        .bind(filter.status.map(|s| s.to_string()))
        .bind(&filter.category)
        .bind(filter.search.as_deref().map(contains_pattern))
        .fetch_one(pool)
        .await?;

    Ok(total)
}

/// Every published article, newest first. Feeds the read cache.
pub async fn list_published(pool: &PgPool) -> Result<Vec<ArticleRow>, DbError> {
    let sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles WHERE status = 'published' \
         ORDER BY COALESCE(published_at, created_at) DESC"
    );
    let rows = sqlx::query_as::<_, ArticleRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Published articles that went live strictly after `since`, newest first.
pub async fn published_since(pool: &PgPool, since: DateTime<Utc>) -> Result<Vec<ArticleRow>, DbError> {
    let sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles \
         WHERE status = 'published' AND COALESCE(published_at, created_at) > $1 \
         ORDER BY COALESCE(published_at, created_at) DESC"
    );
    let rows = sqlx::query_as::<_, ArticleRow>(&sql)
        .bind(since)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Overwrite the editable columns of an existing article.
pub async fn update_article(pool: &PgPool, article: &ArticleRow) -> Result<ArticleRow, DbError> {
    let sql = format!(
        r#"
        UPDATE articles
        SET title = $2, slug = $3, content = $4, excerpt = $5, category = $6, status = $7,
            featured_image = $8, tags = $9, author = $10, featured = $11, trending = $12,
            published_at = $13, updated_at = $14
        WHERE id = $1
        RETURNING {ARTICLE_COLUMNS}
        "#
    );

    sqlx::query_as::<_, ArticleRow>(&sql)
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.content)
        .bind(&article.excerpt)
        .bind(&article.category)
        .bind(&article.status)
        .bind(&article.featured_image)
        .bind(&article.tags)
        .bind(&article.author)
        .bind(article.featured)
        .bind(article.trending)
        .bind(article.published_at)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
        .map_err(DbError::from_write)?
        .ok_or(DbError::NotFound)
}

/// Delete an article together with its queue items and social posts.
///
/// Returns `DbError::NotFound` if no article row was deleted.
pub async fn delete_article(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM social_post_queue WHERE article_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM social_posts WHERE article_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM articles WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(())
}

/// Move every listed article into `category`.
pub async fn update_categories(
    pool: &PgPool,
    ids: &[Uuid],
    category: &str,
) -> Result<Vec<ArticleCategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleCategoryRow>(
        r#"
        UPDATE articles
        SET category = $1, updated_at = $2
        WHERE id = ANY($3)
        RETURNING id, title, category
        "#,
    )
    .bind(category)
    .bind(Utc::now())
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

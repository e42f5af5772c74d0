//! Category operations.

use sqlx::PgPool;

use crate::{
    DbError,
    models::{CategoryCountRow, CategoryRow},
};

/// Every category with its number of published articles, alphabetically.
pub async fn list_with_counts(pool: &PgPool) -> Result<Vec<CategoryCountRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryCountRow>(
        r#"
        SELECT c.id, c.name, c.slug, COUNT(a.id) AS article_count
        FROM categories c
        LEFT JOIN articles a ON a.category = c.id AND a.status = 'published'
        GROUP BY c.id, c.name, c.slug
        ORDER BY c.name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Insert a category. The slug doubles as its primary key.
///
/// Returns `DbError::Conflict` if the slug is taken.
pub async fn create_category(pool: &PgPool, name: &str, slug: &str) -> Result<CategoryRow, DbError> {
    sqlx::query_as::<_, CategoryRow>(
        r#"
        INSERT INTO categories (id, name, slug)
        VALUES ($1, $2, $1)
        RETURNING id, name, slug, created_at
        "#,
    )
    .bind(slug)
    .bind(name)
    .fetch_one(pool)
    .await
    .map_err(DbError::from_write)
}

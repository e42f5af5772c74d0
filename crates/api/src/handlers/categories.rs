use axum::{extract::State, http::StatusCode, Json};
use db::models::{CategoryCountRow, CategoryRow};
use db::repository::{articles as article_repo, categories as category_repo};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::slugify;
use crate::{ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryDto {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateDto {
    #[serde(default)]
    pub article_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pub new_category: Option<String>,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CategoryCountRow>>, ApiError> {
    Ok(Json(category_repo::list_with_counts(&state.pool).await?))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateCategoryDto>,
) -> Result<(StatusCode, Json<CategoryRow>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Category name is required"));
    }
    let slug = slugify(payload.slug.as_deref().unwrap_or(name));
    if slug.is_empty() {
        return Err(ApiError::bad_request("Category slug is empty"));
    }

    let category = category_repo::create_category(&state.pool, name, &slug).await?;
    info!(slug = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn bulk_update(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<BulkUpdateDto>,
) -> Result<Json<Value>, ApiError> {
    let ids = payload
        .article_ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| ApiError::bad_request("articleIds must be a non-empty array"))?;
    let category = payload
        .new_category
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("newCategory is required"))?;

    let articles = article_repo::update_categories(&state.pool, &ids, &category).await?;
    state.cache.clear().await;
    info!(requested = ids.len(), updated = articles.len(), %category, "bulk category update");

    Ok(Json(json!({
        "success": true,
        "updated": articles.len(),
        "articles": articles,
    })))
}

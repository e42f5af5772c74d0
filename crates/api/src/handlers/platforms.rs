use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use db::repository::platforms as platform_repo;
use publishers::Platform;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::{ApiError, ApiJson, AppState};

/// Public view of a platform row; credentials are never included.
#[derive(Debug, Serialize)]
pub struct PlatformSummary {
    pub platform: String,
    pub is_active: bool,
    pub last_posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePlatformDto {
    pub credentials: Option<Value>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub validate: bool,
}

pub async fn list_public(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let platforms: Vec<PlatformSummary> = platform_repo::list_platforms(&state.pool)
        .await?
        .into_iter()
        .map(|row| PlatformSummary {
            platform: row.platform,
            is_active: row.is_active,
            last_posted_at: row.last_posted_at,
        })
        .collect();

    Ok(Json(json!({
        "count": platforms.len(),
        "platforms": platforms,
        "timestamp": Utc::now(),
    })))
}

/// Store credentials and/or the active flag, then drop the cached publisher.
/// With `validate`, the publisher is rebuilt and its credentials checked.
pub async fn update(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    ApiJson(payload): ApiJson<UpdatePlatformDto>,
) -> Result<Json<Value>, ApiError> {
    let platform: Platform = platform.parse().map_err(ApiError::BadRequest)?;
    if payload.credentials.as_ref().is_some_and(|c| !c.is_object()) {
        return Err(ApiError::bad_request("credentials must be a JSON object"));
    }

    let row = platform_repo::upsert_platform(&state.pool, platform.as_str(), payload.credentials, payload.is_active)
        .await?;
    let resolver = state.automation.processor().publishers();
    resolver.evict(platform).await;
    info!(%platform, is_active = row.is_active, "platform updated");

    let mut body = json!({
        "success": true,
        "platform": platform,
        "is_active": row.is_active,
    });
    if payload.validate {
        let (valid, error) = match resolver.resolve(platform).await {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        body["valid"] = json!(valid);
        body["error"] = json!(error);
    }
    Ok(Json(body))
}

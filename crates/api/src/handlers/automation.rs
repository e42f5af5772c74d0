use automation::{DetectorStatus, StartOutcome, SyncSummary};
use axum::{extract::State, Json};
use db::repository::tracking;
use queue::{QueueStats, DEFAULT_CLEANUP_DAYS};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub struct DetectorActionDto {
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckArticleDto {
    pub article_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupDto {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RetryDto {
    pub post_id: Option<Uuid>,
}

pub async fn control_detector(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<DetectorActionDto>,
) -> Result<Json<Value>, ApiError> {
    match payload.action.as_str() {
        "start" => {
            let outcome = state
                .automation
                .start(state.config.detector_interval, state.config.queue_interval)
                .await;
            let message = match outcome {
                StartOutcome::Started        => "Automation started",
                StartOutcome::AlreadyRunning => "Automation already running",
            };
            Ok(Json(json!({ "success": true, "message": message, "outcome": outcome })))
        }
        "stop" => {
            let was_running = state.automation.stop().await;
            Ok(Json(json!({ "success": true, "message": "Automation stopped", "wasRunning": was_running })))
        }
        other => Err(ApiError::bad_request(format!("Invalid action: {other}"))),
    }
}

pub async fn detector_status(State(state): State<AppState>) -> Json<DetectorStatus> {
    Json(state.automation.detector_status().await)
}

pub async fn queue_status(State(state): State<AppState>) -> Result<Json<QueueStats>, ApiError> {
    Ok(Json(state.automation.queue_status().await?))
}

pub async fn check_article(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CheckArticleDto>,
) -> Result<Json<Value>, ApiError> {
    let platforms = state.automation.detector().detect_article(payload.article_id).await?;
    Ok(Json(json!({ "success": true, "queued": platforms.len(), "platforms": platforms })))
}

pub async fn cleanup(
    State(state): State<AppState>,
    payload: Option<ApiJson<CleanupDto>>,
) -> Result<Json<Value>, ApiError> {
    let days = payload.and_then(|ApiJson(p)| p.days).unwrap_or(DEFAULT_CLEANUP_DAYS);
    let removed = state.automation.processor().cleanup(days).await?;
    Ok(Json(json!({ "success": true, "removed": removed, "days": days })))
}

pub async fn retry(State(state): State<AppState>, ApiJson(payload): ApiJson<RetryDto>) -> Result<Json<Value>, ApiError> {
    let post_id = payload.post_id.ok_or_else(|| ApiError::bad_request("Missing post_id"))?;
    let item = state.automation.processor().retry_post(post_id).await?;
    Ok(Json(json!({ "success": true, "queueItem": item })))
}

pub async fn sync_engagement(State(state): State<AppState>) -> Result<Json<SyncSummary>, ApiError> {
    Ok(Json(state.automation.engagement().sync().await?))
}

pub async fn analytics(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let platforms = tracking::platform_analytics(&state.pool).await?;
    let total_clicks: i64 = platforms.iter().map(|p| p.clicks).sum();
    let total_posted: i64 = platforms.iter().map(|p| p.posted).sum();
    Ok(Json(json!({
        "platforms": platforms,
        "totals": { "posted": total_posted, "clicks": total_clicks },
    })))
}

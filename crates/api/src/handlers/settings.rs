use axum::{extract::State, Json};
use db::repository::settings as settings_repo;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{ApiError, ApiJson, AppState};

pub const POPUNDER_KEY: &str = "popunder_enabled";

/// Public; a missing key or a storage error reads as disabled.
pub async fn get_popunder(State(state): State<AppState>) -> Json<Value> {
    let enabled = match settings_repo::get_setting(&state.pool, POPUNDER_KEY).await {
        Ok(row) => row.and_then(|r| r.value).is_some_and(|v| v == "true"),
        Err(e) => {
            warn!("reading popunder setting failed: {e}");
            false
        }
    };
    Json(json!({ "enabled": enabled, "success": true }))
}

pub async fn set_popunder(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<Json<Value>, ApiError> {
    let enabled = payload
        .get("enabled")
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::bad_request("enabled must be a boolean"))?;

    settings_repo::upsert_setting(&state.pool, POPUNDER_KEY, if enabled { "true" } else { "false" }).await?;
    info!(enabled, "popunder setting updated");

    Ok(Json(json!({
        "enabled": enabled,
        "success": true,
        "message": format!("Popunder ads {}", if enabled { "enabled" } else { "disabled" }),
    })))
}

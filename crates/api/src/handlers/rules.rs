use automation::rules::{test_article, RuleTestResult};
use automation::{Article, AutomationRule, NewAutomationRule};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use db::repository::{articles as article_repo, rules as rule_repo};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub struct TestRulesDto {
    pub article_id: Uuid,
}

fn decode(rows: Vec<db::models::RuleRow>) -> Vec<AutomationRule> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            AutomationRule::try_from(row)
                .map_err(|e| warn!(%id, "skipping undecodable rule: {e}"))
                .ok()
        })
        .collect()
}

fn validate(rule: &NewAutomationRule) -> Result<(), ApiError> {
    if rule.name.trim().is_empty() {
        return Err(ApiError::bad_request("Rule name is required"));
    }
    if rule.platforms.is_empty() {
        return Err(ApiError::bad_request("A rule needs at least one platform"));
    }
    Ok(())
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<AutomationRule>>, ApiError> {
    Ok(Json(decode(rule_repo::list_rules(&state.pool).await?)))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewAutomationRule>,
) -> Result<(StatusCode, Json<AutomationRule>), ApiError> {
    validate(&payload)?;
    let row = rule_repo::create_rule(&state.pool, &payload.to_row()?).await?;
    let rule = AutomationRule::try_from(row)?;
    info!(id = %rule.id, name = %rule.name, "automation rule created");
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<NewAutomationRule>,
) -> Result<Json<AutomationRule>, ApiError> {
    validate(&payload)?;
    let row = match rule_repo::update_rule(&state.pool, id, &payload.to_row()?).await {
        Ok(row) => row,
        Err(db::DbError::NotFound) => return Err(ApiError::not_found("Rule")),
        Err(e) => return Err(e.into()),
    };
    info!(%id, "automation rule updated");
    Ok(Json(AutomationRule::try_from(row)?))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    match rule_repo::delete_rule(&state.pool, id).await {
        Ok(()) => {
            info!(%id, "automation rule deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(db::DbError::NotFound) => Err(ApiError::not_found("Rule")),
        Err(e) => Err(e.into()),
    }
}

/// Which active rules match an article, ignoring posting history.
pub async fn test(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TestRulesDto>,
) -> Result<Json<RuleTestResult>, ApiError> {
    let article = match article_repo::get_article(&state.pool, payload.article_id).await {
        Ok(row) => Article::from(row),
        Err(db::DbError::NotFound) => return Err(ApiError::not_found("Article")),
        Err(e) => return Err(e.into()),
    };
    let rules = decode(rule_repo::list_active_rules(&state.pool).await?);
    Ok(Json(test_article(&rules, &article)))
}

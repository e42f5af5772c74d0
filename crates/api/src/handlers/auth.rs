use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::{clear_cookie, session_cookie, Role};
use crate::{ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginDto>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.sessions.check_login(&payload.email, &payload.password) {
        warn!(email = %payload.email, "rejected login");
        return Err(ApiError::Unauthorized);
    }

    let (token, expires_at) = state
        .sessions
        .issue(&payload.email, Role::Admin, Utc::now())
        .map_err(|e| ApiError::Internal(format!("signing session: {e:?}")))?;
    let cookie = session_cookie(&token, state.sessions.ttl(), state.config.secure_cookies());
    info!(email = %payload.email, "admin signed in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "token": token,
            "email": payload.email.trim().to_lowercase(),
            "role": Role::Admin,
            "expiresAt": expires_at,
        })),
    ))
}

pub async fn current(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    match state.sessions.from_headers(&headers) {
        Ok(session) => Json(json!(session)),
        Err(_) => Json(json!({ "role": Role::Public })),
    }
}

pub async fn logout() -> impl IntoResponse {
    ([(header::SET_COOKIE, clear_cookie())], Json(json!({ "success": true })))
}

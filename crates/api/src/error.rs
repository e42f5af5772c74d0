//! HTTP error type.

use automation::AutomationError;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use db::DbError;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_)   => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized    => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden       => StatusCode::FORBIDDEN,
            ApiError::NotFound(_)     => StatusCode::NOT_FOUND,
            ApiError::Conflict(_)     => StatusCode::CONFLICT,
            ApiError::Internal(_)     => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self {
            ApiError::Internal(detail) => {
                error!("request failed: {detail}");
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound    => ApiError::NotFound("Not found".into()),
            DbError::Conflict(m) => ApiError::Conflict(m),
            other                => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AutomationError> for ApiError {
    fn from(err: AutomationError) -> Self {
        match err {
            AutomationError::ArticleNotFound(_) => ApiError::not_found("Article"),
            AutomationError::PostNotFound(_)    => ApiError::not_found("Post"),
            AutomationError::InvalidRule(m)     => ApiError::BadRequest(m),
            e @ AutomationError::InvalidRetention(_) => ApiError::BadRequest(e.to_string()),
            AutomationError::Database(e)        => e.into(),
            other                               => ApiError::Internal(other.to_string()),
        }
    }
}

/// `Json` whose rejections render as a 400 `ApiError`.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_map_to_statuses() {
        let not_found: ApiError = DbError::NotFound.into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let conflict: ApiError = DbError::Conflict("slug taken".into()).into();
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn automation_errors_map_to_statuses() {
        let missing: ApiError = AutomationError::PostNotFound(uuid::Uuid::nil()).into();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let invalid: ApiError = AutomationError::InvalidRule("no platforms".into()).into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let store: ApiError = AutomationError::Store("down".into()).into();
        assert_eq!(store.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

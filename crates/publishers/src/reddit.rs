//! Reddit client (OAuth2 refresh-token flow).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::http::{header_rate_limit, json_body, parse_credentials, status_error, transport_error};
use crate::{EngagementMetrics, Platform, PostReceipt, PublishError, RateLimit, SocialContent, SocialPublisher};

const NAME: &str = "reddit";
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

fn default_subreddit() -> String {
    "test".to_owned()
}

fn default_user_agent() -> String {
    "newsroom-automation/0.1".to_owned()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

struct CachedToken {
    value: String,
    expires: Instant,
}

pub struct RedditPublisher {
    http: Client,
    credentials: RedditCredentials,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SubmitResponse {
    json: SubmitBody,
}

#[derive(Deserialize)]
struct SubmitBody {
    #[serde(default)]
    errors: Vec<Vec<Value>>,
    data: Option<SubmitData>,
}

#[derive(Deserialize)]
struct SubmitData {
    id: String,
    url: String,
}

impl RedditPublisher {
    pub fn new(http: Client, credentials: Value) -> Result<Self, PublishError> {
        Ok(Self {
            http,
            credentials: parse_credentials(NAME, credentials)?,
            token: Mutex::new(None),
        })
    }

    /// Cached access token, refreshed a minute before it expires.
    async fn access_token(&self) -> Result<String, PublishError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let basic = STANDARD.encode(format!("{}:{}", self.credentials.client_id, self.credentials.client_secret));
        let response = self
            .http
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {basic}"))
            .header("User-Agent", &self.credentials.user_agent)
            .form(&[("grant_type", "refresh_token"), ("refresh_token", self.credentials.refresh_token.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let token: TokenResponse = json_body(NAME, response).await?;

        debug!(expires_in = token.expires_in, "refreshed reddit access token");
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *cached = Some(CachedToken { value: token.access_token.clone(), expires: Instant::now() + lifetime });
        Ok(token.access_token)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, PublishError> {
        let token = self.access_token().await?;
        self.http
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .header("User-Agent", &self.credentials.user_agent)
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))
    }
}

/// Reddit's fullname prefix for links.
fn fullname(post_id: &str) -> String {
    if post_id.starts_with("t3_") {
        post_id.to_owned()
    } else {
        format!("t3_{post_id}")
    }
}

/// `RATELIMIT` submit errors are worth retrying, anything else is not.
fn submit_error(errors: &[Vec<Value>]) -> PublishError {
    let message = errors
        .iter()
        .map(|e| e.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(": "))
        .collect::<Vec<_>>()
        .join("; ");
    let throttled = errors
        .iter()
        .any(|e| e.first().and_then(Value::as_str) == Some("RATELIMIT"));

    if throttled {
        PublishError::Retryable(format!("reddit rejected submission: {message}"))
    } else {
        PublishError::Fatal(format!("reddit rejected submission: {message}"))
    }
}

#[async_trait]
impl SocialPublisher for RedditPublisher {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    async fn post(&self, content: &SocialContent) -> Result<PostReceipt, PublishError> {
        let token = self.access_token().await?;
        let mut form = vec![
            ("api_type", "json".to_owned()),
            ("sr", self.credentials.subreddit.clone()),
            ("title", content.text.clone()),
        ];
        if content.link.is_empty() {
            form.push(("kind", "self".to_owned()));
            form.push(("text", content.text.clone()));
        } else {
            form.push(("kind", "link".to_owned()));
            form.push(("url", content.link.clone()));
        }

        let response = self
            .http
            .post(format!("{API_BASE}/api/submit"))
            .bearer_auth(token)
            .header("User-Agent", &self.credentials.user_agent)
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let body: SubmitResponse = json_body(NAME, response).await?;

        if !body.json.errors.is_empty() {
            return Err(submit_error(&body.json.errors));
        }
        let data = body
            .json
            .data
            .ok_or_else(|| PublishError::Fatal("reddit submit returned no data".into()))?;

        Ok(PostReceipt { post_id: data.id, post_url: data.url })
    }

    async fn delete_post(&self, post_id: &str) -> Result<bool, PublishError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{API_BASE}/api/del"))
            .bearer_auth(token)
            .header("User-Agent", &self.credentials.user_agent)
            .form(&[("id", fullname(post_id))])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;

        Ok(response.status().is_success())
    }

    async fn engagement(&self, post_id: &str) -> Result<EngagementMetrics, PublishError> {
        let response = self.get(&format!("/api/info?id={}", fullname(post_id))).await?;
        let body: Value = json_body(NAME, response).await?;
        let data = &body["data"]["children"][0]["data"];
        if data.is_null() {
            return Err(PublishError::Fatal(format!("reddit post {post_id} not found")));
        }

        Ok(EngagementMetrics {
            likes: data["ups"].as_i64().unwrap_or(0),
            shares: data["num_crossposts"].as_i64().unwrap_or(0),
            comments: data["num_comments"].as_i64().unwrap_or(0),
            views: data["view_count"].as_i64(),
            reach: None,
            engagement_rate: data["upvote_ratio"].as_f64(),
        })
    }

    async fn validate_credentials(&self) -> Result<bool, PublishError> {
        match self.get("/api/v1/me").await {
            Ok(response) => Ok(response.status().is_success()),
            Err(PublishError::Fatal(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn rate_limit(&self) -> Result<RateLimit, PublishError> {
        let response = self.get("/api/v1/me").await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(NAME, status, &body));
        }
        Ok(header_rate_limit(response.headers(), "x-ratelimit-remaining", "x-ratelimit-reset"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subreddit_defaults_to_test() {
        let creds: RedditCredentials = serde_json::from_value(json!({
            "client_id": "id", "client_secret": "secret", "refresh_token": "rt"
        }))
        .unwrap();
        assert_eq!(creds.subreddit, "test");
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = RedditPublisher::new(Client::new(), json!({ "client_id": "id" })).err().unwrap();
        assert!(matches!(err, PublishError::Fatal(_)));
    }

    #[test]
    fn fullname_is_prefixed_once() {
        assert_eq!(fullname("abc"), "t3_abc");
        assert_eq!(fullname("t3_abc"), "t3_abc");
    }

    #[test]
    fn ratelimit_submit_errors_are_retryable() {
        let errors = vec![vec![json!("RATELIMIT"), json!("you are doing that too much"), json!("ratelimit")]];
        assert!(submit_error(&errors).is_retryable());

        let errors = vec![vec![json!("SUBREDDIT_NOEXIST"), json!("that subreddit doesn't exist")]];
        assert!(!submit_error(&errors).is_retryable());
    }
}

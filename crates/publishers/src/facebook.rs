//! Facebook Page client (Graph API).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::http::{app_usage_rate_limit, json_body, parse_credentials, status_error, transport_error};
use crate::{EngagementMetrics, Platform, PostReceipt, PublishError, RateLimit, SocialContent, SocialPublisher};

const NAME: &str = "facebook";
pub(crate) const GRAPH_BASE: &str = "https://graph.facebook.com/v18.0";

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookCredentials {
    pub page_id: String,
    pub access_token: String,
}

pub struct FacebookPublisher {
    http: Client,
    credentials: FacebookCredentials,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: String,
    /// Photo uploads return the photo id in `id` and the feed post in `post_id`.
    post_id: Option<String>,
}

impl FacebookPublisher {
    pub fn new(http: Client, credentials: Value) -> Result<Self, PublishError> {
        Ok(Self { http, credentials: parse_credentials(NAME, credentials)? })
    }
}

/// Pull `<field>.summary.total_count` out of a Graph API object.
fn summary_count(body: &Value, field: &str) -> i64 {
    body[field]["summary"]["total_count"].as_i64().unwrap_or(0)
}

#[async_trait]
impl SocialPublisher for FacebookPublisher {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn post(&self, content: &SocialContent) -> Result<PostReceipt, PublishError> {
        let page = &self.credentials.page_id;
        let token = self.credentials.access_token.as_str();

        let request = match content.media_url.as_deref() {
            Some(image) => self
                .http
                .post(format!("{GRAPH_BASE}/{page}/photos"))
                .form(&[("url", image), ("caption", content.text.as_str()), ("access_token", token)]),
            None => self
                .http
                .post(format!("{GRAPH_BASE}/{page}/feed"))
                .form(&[("message", content.text.as_str()), ("link", content.link.as_str()), ("access_token", token)]),
        };

        let response = request.send().await.map_err(|e| transport_error(NAME, e))?;
        let created: CreatedPost = json_body(NAME, response).await?;
        let post_id = created.post_id.unwrap_or(created.id);

        Ok(PostReceipt { post_url: format!("https://www.facebook.com/{post_id}"), post_id })
    }

    async fn delete_post(&self, post_id: &str) -> Result<bool, PublishError> {
        let response = self
            .http
            .delete(format!("{GRAPH_BASE}/{post_id}"))
            .query(&[("access_token", &self.credentials.access_token)])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let body: Value = json_body(NAME, response).await?;
        Ok(body["success"].as_bool().unwrap_or(false))
    }

    async fn engagement(&self, post_id: &str) -> Result<EngagementMetrics, PublishError> {
        let response = self
            .http
            .get(format!("{GRAPH_BASE}/{post_id}"))
            .query(&[
                ("fields", "likes.summary(true),comments.summary(true),shares"),
                ("access_token", self.credentials.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let body: Value = json_body(NAME, response).await?;

        Ok(EngagementMetrics {
            likes: summary_count(&body, "likes"),
            comments: summary_count(&body, "comments"),
            shares: body["shares"]["count"].as_i64().unwrap_or(0),
            ..Default::default()
        })
    }

    async fn validate_credentials(&self) -> Result<bool, PublishError> {
        let response = self
            .http
            .get(format!("{GRAPH_BASE}/me"))
            .query(&[("access_token", &self.credentials.access_token)])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        Ok(response.status().is_success())
    }

    async fn rate_limit(&self) -> Result<RateLimit, PublishError> {
        let response = self
            .http
            .get(format!("{GRAPH_BASE}/me"))
            .query(&[("access_token", &self.credentials.access_token)])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(NAME, status, &body));
        }
        Ok(app_usage_rate_limit(response.headers()))
    }
}

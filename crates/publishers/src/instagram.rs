//! Instagram business account client (two-step container publish).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::facebook::GRAPH_BASE;
use crate::http::{app_usage_rate_limit, json_body, parse_credentials, status_error, transport_error};
use crate::{EngagementMetrics, Platform, PostReceipt, PublishError, RateLimit, SocialContent, SocialPublisher};

const NAME: &str = "instagram";

#[derive(Debug, Clone, Deserialize)]
pub struct InstagramCredentials {
    pub account_id: String,
    pub access_token: String,
}

pub struct InstagramPublisher {
    http: Client,
    credentials: InstagramCredentials,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

impl InstagramPublisher {
    pub fn new(http: Client, credentials: Value) -> Result<Self, PublishError> {
        Ok(Self { http, credentials: parse_credentials(NAME, credentials)? })
    }

    async fn create_container(&self, image_url: &str, caption: &str) -> Result<String, PublishError> {
        let response = self
            .http
            .post(format!("{GRAPH_BASE}/{}/media", self.credentials.account_id))
            .form(&[
                ("image_url", image_url),
                ("caption", caption),
                ("access_token", self.credentials.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let created: Created = json_body(NAME, response).await?;
        Ok(created.id)
    }

    async fn publish_container(&self, creation_id: &str) -> Result<String, PublishError> {
        let response = self
            .http
            .post(format!("{GRAPH_BASE}/{}/media_publish", self.credentials.account_id))
            .form(&[("creation_id", creation_id), ("access_token", self.credentials.access_token.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let published: Created = json_body(NAME, response).await?;
        Ok(published.id)
    }

    /// The media permalink; not fatal when the lookup fails.
    async fn permalink(&self, media_id: &str) -> Option<String> {
        let response = self
            .http
            .get(format!("{GRAPH_BASE}/{media_id}"))
            .query(&[("fields", "permalink"), ("access_token", self.credentials.access_token.as_str())])
            .send()
            .await
            .ok()?;
        let body: Value = response.json().await.ok()?;
        body["permalink"].as_str().map(str::to_owned)
    }

    async fn get_me(&self) -> Result<reqwest::Response, PublishError> {
        self.http
            .get(format!("{GRAPH_BASE}/{}", self.credentials.account_id))
            .query(&[("fields", "id,username"), ("access_token", self.credentials.access_token.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))
    }
}

#[async_trait]
impl SocialPublisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn post(&self, content: &SocialContent) -> Result<PostReceipt, PublishError> {
        let image = content
            .media_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PublishError::Fatal("instagram posts require an image".into()))?;

        let container = self.create_container(image, &content.text).await?;
        debug!(container = %container, "instagram media container created");
        let media_id = self.publish_container(&container).await?;

        let post_url = self
            .permalink(&media_id)
            .await
            .unwrap_or_else(|| format!("https://www.instagram.com/p/{media_id}"));

        Ok(PostReceipt { post_id: media_id, post_url })
    }

    /// The Graph API has no delete for published media.
    async fn delete_post(&self, _post_id: &str) -> Result<bool, PublishError> {
        Ok(false)
    }

    async fn engagement(&self, post_id: &str) -> Result<EngagementMetrics, PublishError> {
        let response = self
            .http
            .get(format!("{GRAPH_BASE}/{post_id}"))
            .query(&[
                ("fields", "like_count,comments_count"),
                ("access_token", self.credentials.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let body: Value = json_body(NAME, response).await?;

        Ok(EngagementMetrics {
            likes: body["like_count"].as_i64().unwrap_or(0),
            comments: body["comments_count"].as_i64().unwrap_or(0),
            ..Default::default()
        })
    }

    async fn validate_credentials(&self) -> Result<bool, PublishError> {
        Ok(self.get_me().await?.status().is_success())
    }

    async fn rate_limit(&self) -> Result<RateLimit, PublishError> {
        let response = self.get_me().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(NAME, status, &body));
        }
        Ok(app_usage_rate_limit(response.headers()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn post_without_image_is_fatal_before_any_request() {
        let publisher = InstagramPublisher::new(
            Client::new(),
            json!({ "account_id": "17841400000000000", "access_token": "token" }),
        )
        .unwrap();
        let content = SocialContent {
            text: "caption".into(),
            hashtags: vec![],
            media_url: None,
            link: "https://news.example.com/articles/a".into(),
        };

        let err = publisher.post(&content).await.unwrap_err();
        assert!(matches!(err, PublishError::Fatal(_)));
    }

    #[tokio::test]
    async fn delete_is_unsupported() {
        let publisher = InstagramPublisher::new(
            Client::new(),
            json!({ "account_id": "1", "access_token": "token" }),
        )
        .unwrap();
        assert!(!publisher.delete_post("123").await.unwrap());
    }
}

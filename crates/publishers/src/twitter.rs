//! Twitter / X client (API v2, OAuth2 user-context bearer token).
//!
//! Text-only: media upload still lives on the v1.1 endpoint, which needs
//! OAuth 1.0a signing.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::{header_rate_limit, json_body, parse_credentials, status_error, transport_error};
use crate::{EngagementMetrics, Platform, PostReceipt, PublishError, RateLimit, SocialContent, SocialPublisher};

const NAME: &str = "twitter";
const API_BASE: &str = "https://api.twitter.com/2";

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterCredentials {
    pub bearer_token: String,
}

pub struct TwitterPublisher {
    http: Client,
    credentials: TwitterCredentials,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Deserialize, Default)]
struct PublicMetrics {
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    retweet_count: i64,
    #[serde(default)]
    quote_count: i64,
    #[serde(default)]
    reply_count: i64,
    impression_count: Option<i64>,
}

#[derive(Deserialize)]
struct TweetWithMetrics {
    #[serde(default)]
    public_metrics: PublicMetrics,
}

impl TwitterPublisher {
    pub fn new(http: Client, credentials: Value) -> Result<Self, PublishError> {
        Ok(Self { http, credentials: parse_credentials(NAME, credentials)? })
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, PublishError> {
        self.http
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(&self.credentials.bearer_token)
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))
    }
}

impl From<PublicMetrics> for EngagementMetrics {
    fn from(m: PublicMetrics) -> Self {
        let interactions = m.like_count + m.retweet_count + m.quote_count + m.reply_count;
        let engagement_rate = m
            .impression_count
            .filter(|&n| n > 0)
            .map(|n| interactions as f64 / n as f64 * 100.0);

        EngagementMetrics {
            likes: m.like_count,
            shares: m.retweet_count + m.quote_count,
            comments: m.reply_count,
            views: m.impression_count,
            reach: None,
            engagement_rate,
        }
    }
}

#[async_trait]
impl SocialPublisher for TwitterPublisher {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn post(&self, content: &SocialContent) -> Result<PostReceipt, PublishError> {
        let response = self
            .http
            .post(format!("{API_BASE}/tweets"))
            .bearer_auth(&self.credentials.bearer_token)
            .json(&json!({ "text": content.text }))
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let created: Envelope<CreatedTweet> = json_body(NAME, response).await?;
        let id = created.data.id;

        Ok(PostReceipt { post_url: format!("https://twitter.com/i/web/status/{id}"), post_id: id })
    }

    async fn delete_post(&self, post_id: &str) -> Result<bool, PublishError> {
        let response = self
            .http
            .delete(format!("{API_BASE}/tweets/{post_id}"))
            .bearer_auth(&self.credentials.bearer_token)
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;
        let body: Value = json_body(NAME, response).await?;
        Ok(body["data"]["deleted"].as_bool().unwrap_or(false))
    }

    async fn engagement(&self, post_id: &str) -> Result<EngagementMetrics, PublishError> {
        let response = self.get(&format!("/tweets/{post_id}?tweet.fields=public_metrics")).await?;
        let tweet: Envelope<TweetWithMetrics> = json_body(NAME, response).await?;
        Ok(tweet.data.public_metrics.into())
    }

    async fn validate_credentials(&self) -> Result<bool, PublishError> {
        let response = self.get("/users/me").await?;
        Ok(response.status().is_success())
    }

    async fn rate_limit(&self) -> Result<RateLimit, PublishError> {
        let response = self.get("/users/me").await?;
        let status = response.status();
        if !status.is_success() && status.as_u16() != 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(NAME, status, &body));
        }
        Ok(header_rate_limit(response.headers(), "x-rate-limit-remaining", "x-rate-limit-reset"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_metrics_fold_into_engagement() {
        let tweet: Envelope<TweetWithMetrics> = serde_json::from_value(json!({
            "data": {
                "id": "1",
                "public_metrics": {
                    "like_count": 6, "retweet_count": 2, "quote_count": 1,
                    "reply_count": 1, "impression_count": 200
                }
            }
        }))
        .unwrap();

        let metrics: EngagementMetrics = tweet.data.public_metrics.into();
        assert_eq!(metrics.likes, 6);
        assert_eq!(metrics.shares, 3);
        assert_eq!(metrics.comments, 1);
        assert_eq!(metrics.views, Some(200));
        assert_eq!(metrics.engagement_rate, Some(5.0));
    }

    #[test]
    fn missing_metrics_mean_zero_engagement() {
        let tweet: TweetWithMetrics = serde_json::from_value(json!({})).unwrap();
        let metrics: EngagementMetrics = tweet.public_metrics.into();
        assert_eq!(metrics, EngagementMetrics::default());
    }
}

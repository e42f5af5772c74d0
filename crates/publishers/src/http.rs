//! Shared HTTP helpers for the platform clients.

use chrono::{Duration, TimeZone, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{PublishError, RateLimit};

/// Map a transport failure onto the retry taxonomy.
pub(crate) fn transport_error(platform: &str, err: reqwest::Error) -> PublishError {
    PublishError::Retryable(format!("{platform} request failed: {err}"))
}

/// Classify an HTTP status: 429 and 5xx are worth retrying, other 4xx are not.
pub(crate) fn status_error(platform: &str, status: StatusCode, body: &str) -> PublishError {
    let message = format!("{platform} responded {status}: {}", truncate(body, 300));
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        PublishError::Retryable(message)
    } else {
        PublishError::Fatal(message)
    }
}

/// Read a JSON body, turning non-2xx responses into a classified error.
pub(crate) async fn json_body<T: DeserializeOwned>(platform: &str, response: Response) -> Result<T, PublishError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(platform, status, &body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| PublishError::Fatal(format!("{platform} returned an unexpected body: {e}")))
}

/// Pull a typed credentials struct out of the stored JSON blob.
pub(crate) fn parse_credentials<T: DeserializeOwned>(
    platform: &str,
    credentials: serde_json::Value,
) -> Result<T, PublishError> {
    serde_json::from_value(credentials)
        .map_err(|e| PublishError::Fatal(format!("invalid {platform} credentials: {e}")))
}

/// Rate limit from `<remaining>` / `<reset>` headers.
///
/// `reset` is read as a unix timestamp when it looks like one, otherwise as
/// seconds from now (Reddit sends the latter).
pub(crate) fn header_rate_limit(headers: &HeaderMap, remaining: &str, reset: &str) -> RateLimit {
    let number = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
    };

    let Some(left) = number(remaining) else {
        return RateLimit::unknown();
    };
    let reset_at = match number(reset) {
        Some(n) if n > 1_000_000_000.0 => Utc.timestamp_opt(n as i64, 0).single().unwrap_or_else(Utc::now),
        Some(n) => {
            let now = Utc::now();
            Duration::try_seconds(n as i64)
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(now)
        }
        None => Utc::now(),
    };

    RateLimit { remaining: left.max(0.0) as u32, reset: reset_at }
}

/// Meta's `x-app-usage` header reports percentages of the hourly budget used.
pub(crate) fn app_usage_rate_limit(headers: &HeaderMap) -> RateLimit {
    let used = headers
        .get("x-app-usage")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| serde_json::from_str::<serde_json::Value>(v).ok())
        .and_then(|v| v.get("call_count").and_then(|c| c.as_f64()));

    match used {
        Some(pct) => RateLimit {
            remaining: (100.0 - pct).max(0.0) as u32,
            reset: Utc::now() + Duration::hours(1),
        },
        None => RateLimit::unknown(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::Redirect,
};
use db::models::NewClick;
use db::repository::{articles as article_repo, posts, tracking};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub c: Option<String>,
}

/// Classify a user agent as `mobile`, `tablet` or `desktop`.
pub fn device_type(user_agent: &str) -> &'static str {
    let ua = user_agent.to_lowercase();
    if ua.contains("ipad") || ua.contains("tablet") || (ua.contains("android") && !ua.contains("mobile")) {
        "tablet"
    } else if ua.contains("mobi") || ua.contains("iphone") || ua.contains("android") {
        "mobile"
    } else {
        "desktop"
    }
}

/// First address in `X-Forwarded-For`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_owned())
        .filter(|ip| !ip.is_empty())
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

pub fn article_redirect(slug: &str, code: &str) -> String {
    format!("/articles/{slug}?utm_source=social&utm_medium={code}&utm_campaign=social_marketing")
}

/// Record a click on a tracked short link and send the visitor on to the
/// article. Unknown codes go to the home page.
pub async fn track_click(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let code = query
        .c
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing tracking code"))?;

    let Some(post) = posts::find_by_short_code(&state.pool, &code).await? else {
        debug!(%code, "unknown tracking code");
        return Ok(Redirect::to("/"));
    };

    let user_agent = header_string(&headers, header::USER_AGENT);
    let click = NewClick {
        social_post_id: post.id,
        short_code: code.clone(),
        ip_address: client_ip(&headers),
        device_type: device_type(user_agent.as_deref().unwrap_or_default()).to_owned(),
        user_agent,
        referrer: header_string(&headers, header::REFERER),
    };
    if let Err(e) = tracking::record_click(&state.pool, &click).await {
        warn!(%code, "recording click failed: {e}");
    }

    match article_repo::get_article(&state.pool, post.article_id).await {
        Ok(article) => Ok(Redirect::to(&article_redirect(&article.slug, &code))),
        Err(db::DbError::NotFound) => Ok(Redirect::to("/")),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn classifies_devices() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
        let ipad = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)";
        let android_phone = "Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile Safari/537.36";
        let android_tablet = "Mozilla/5.0 (Linux; Android 13; SM-X700) Safari/537.36";
        let desktop = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0";

        assert_eq!(device_type(iphone), "mobile");
        assert_eq!(device_type(ipad), "tablet");
        assert_eq!(device_type(android_phone), "mobile");
        assert_eq!(device_type(android_tablet), "tablet");
        assert_eq!(device_type(desktop), "desktop");
        assert_eq!(device_type(""), "desktop");
    }

    #[test]
    fn first_forwarded_address_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn redirect_carries_campaign_parameters() {
        assert_eq!(
            article_redirect("leg-day", "Ab12Cd34"),
            "/articles/leg-day?utm_source=social&utm_medium=Ab12Cd34&utm_campaign=social_marketing"
        );
    }
}

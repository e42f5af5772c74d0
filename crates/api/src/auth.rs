//! Signed session tokens and the admin gate.
//!
//! A token is `base64url(email|role|expires_unix)` followed by `.` and the
//! hex HMAC-SHA256 of that encoded payload. It travels either as a
//! `Bearer` token or in the `newsroom_session` cookie.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::{ApiError, AppState};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "newsroom_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Public,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Admin  => "admin",
            Self::Public => "public",
        }
    }
}

/// A verified session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    InvalidKey,
    Malformed,
    BadSignature,
    Expired,
}

/// Signing key plus the admin whitelist.
pub struct SessionKeys {
    secret: Vec<u8>,
    admin_emails: Vec<String>,
    admin_password: Option<String>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        admin_emails: impl IntoIterator<Item = String>,
        admin_password: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            secret: secret.into(),
            admin_emails: admin_emails
                .into_iter()
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            admin_password: admin_password.filter(|p| !p.is_empty()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }

    /// Both the whitelist and the password must match.
    pub fn check_login(&self, email: &str, password: &str) -> bool {
        let Some(expected) = self.admin_password.as_deref() else {
            warn!("login attempted but no admin password is configured");
            return false;
        };
        let password_ok: bool = expected.as_bytes().ct_eq(password.as_bytes()).into();
        password_ok && self.is_admin_email(email)
    }

    pub fn issue(&self, email: &str, role: Role, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>), TokenError> {
        let expires_at = now + self.ttl;
        let payload = URL_SAFE_NO_PAD.encode(format!(
            "{}|{}|{}",
            email.trim().to_lowercase(),
            role.as_str(),
            expires_at.timestamp()
        ));
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok((format!("{payload}.{signature}"), expires_at))
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;
        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let decoded = URL_SAFE_NO_PAD.decode(payload).map_err(|_| TokenError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| TokenError::Malformed)?;
        let mut parts = decoded.rsplitn(3, '|');
        let (Some(expires), Some(role), Some(email)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(TokenError::Malformed);
        };

        let expires_at = expires
            .parse::<i64>()
            .ok()
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .ok_or(TokenError::Malformed)?;
        if expires_at <= now {
            return Err(TokenError::Expired);
        }

        // A token only grants admin while its email is still whitelisted.
        let role = match role {
            "admin" if self.is_admin_email(email) => Role::Admin,
            "admin" | "public" => Role::Public,
            _ => return Err(TokenError::Malformed),
        };

        Ok(Session { email: email.to_owned(), role, expires_at })
    }

    /// The session carried by a request, if any.
    pub fn from_headers(&self, headers: &HeaderMap) -> Result<Session, TokenError> {
        let token = token_from_headers(headers).ok_or(TokenError::Malformed)?;
        self.verify(&token, Utc::now())
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret).map_err(|_| TokenError::InvalidKey)?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

/// Bearer token first, then the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(bearer.trim().to_owned());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_owned())
}

pub fn session_cookie(token: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        max_age.num_seconds().max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Middleware for `/api/admin/*`: 401 without a valid session, 403 for
/// non-admins. The verified [`Session`] is stored in request extensions.
pub async fn require_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let session = state.sessions.from_headers(req.headers()).map_err(|e| {
        debug!(path = %req.uri().path(), "rejected session: {e:?}");
        ApiError::Unauthorized
    })?;
    if session.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use automation::AutomationController;
use db::DbPool;

use crate::auth::SessionKeys;
use crate::cache::ArticleCache;

/// Server settings that handlers read.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Public site URL, without a trailing slash.
    pub site_url: String,
    pub cache_ttl: Duration,
    pub detector_interval: Duration,
    pub queue_interval: Duration,
}

impl ApiConfig {
    /// Mark cookies `Secure` when the site is served over HTTPS.
    pub fn secure_cookies(&self) -> bool {
        self.site_url.starts_with("https://")
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub automation: Arc<AutomationController>,
    pub cache: Arc<ArticleCache>,
    pub sessions: Arc<SessionKeys>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, automation: AutomationController, sessions: SessionKeys, config: ApiConfig) -> Self {
        let cache = ArticleCache::new(pool.clone(), config.cache_ttl);
        Self {
            pool,
            automation: Arc::new(automation),
            cache: Arc::new(cache),
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        }
    }
}

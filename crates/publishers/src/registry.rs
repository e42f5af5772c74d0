//! Publisher construction and the per-process publisher cache.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::facebook::FacebookPublisher;
use crate::instagram::InstagramPublisher;
use crate::reddit::RedditPublisher;
use crate::twitter::TwitterPublisher;
use crate::{Platform, PublishError, SocialPublisher};

/// Build the client for `platform` from its stored credentials blob.
///
/// # Errors
/// `PublishError::Fatal` when the credentials do not have the shape the
/// platform needs.
pub fn build_publisher(
    platform: Platform,
    credentials: Value,
    http: Client,
) -> Result<Arc<dyn SocialPublisher>, PublishError> {
    let publisher: Arc<dyn SocialPublisher> = match platform {
        Platform::Reddit    => Arc::new(RedditPublisher::new(http, credentials)?),
        Platform::Facebook  => Arc::new(FacebookPublisher::new(http, credentials)?),
        Platform::Twitter   => Arc::new(TwitterPublisher::new(http, credentials)?),
        Platform::Instagram => Arc::new(InstagramPublisher::new(http, credentials)?),
    };
    Ok(publisher)
}

/// Initialised publishers keyed by platform.
///
/// Publishers are built lazily on first use and kept until evicted, so the
/// Reddit token cache survives between queue batches.
#[derive(Default)]
pub struct PublisherRegistry {
    publishers: RwLock<HashMap<Platform, Arc<dyn SocialPublisher>>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, platform: Platform) -> Option<Arc<dyn SocialPublisher>> {
        self.publishers.read().await.get(&platform).cloned()
    }

    pub async fn insert(&self, publisher: Arc<dyn SocialPublisher>) {
        self.publishers.write().await.insert(publisher.platform(), publisher);
    }

    /// Drop a cached publisher, e.g. after its credentials changed.
    pub async fn evict(&self, platform: Platform) -> bool {
        self.publishers.write().await.remove(&platform).is_some()
    }

    pub async fn clear(&self) {
        self.publishers.write().await.clear();
    }

    pub async fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.publishers.read().await.keys().copied().collect();
        platforms.sort();
        platforms
    }
}

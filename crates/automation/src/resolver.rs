//! Lazily builds and caches the publisher for each platform.

use std::sync::Arc;

use publishers::{build_publisher, Platform, PublishError, PublisherRegistry, SocialPublisher};
use reqwest::Client;
use tracing::{info, warn};

use crate::AutomationStore;

pub struct PublisherResolver {
    registry: PublisherRegistry,
    store: Arc<dyn AutomationStore>,
    http: Client,
}

impl PublisherResolver {
    pub fn new(store: Arc<dyn AutomationStore>, http: Client) -> Self {
        Self { registry: PublisherRegistry::new(), store, http }
    }

    /// The registry backing this resolver; tests pre-load it with mocks.
    pub fn registry(&self) -> &PublisherRegistry {
        &self.registry
    }

    /// The cached publisher, or a new one built from the stored credentials.
    ///
    /// # Errors
    /// `NotConfigured` when the platform is inactive or has no credentials,
    /// `Fatal` when the platform rejects them.
    pub async fn resolve(&self, platform: Platform) -> Result<Arc<dyn SocialPublisher>, PublishError> {
        if let Some(publisher) = self.registry.get(platform).await {
            return Ok(publisher);
        }

        let credentials = self
            .store
            .platform_credentials(platform)
            .await
            .map_err(|e| PublishError::Retryable(format!("loading {platform} credentials: {e}")))?
            .ok_or_else(|| PublishError::NotConfigured(platform.to_string()))?;

        let publisher = build_publisher(platform, credentials, self.http.clone())?;
        if !publisher.validate_credentials().await? {
            warn!(%platform, "stored credentials were rejected");
            return Err(PublishError::Fatal(format!("{platform} credentials are invalid")));
        }

        info!(%platform, "publisher initialised");
        self.registry.insert(publisher.clone()).await;
        Ok(publisher)
    }

    /// Forget the cached publisher so the next use reloads credentials.
    pub async fn evict(&self, platform: Platform) {
        if self.registry.evict(platform).await {
            info!(%platform, "publisher evicted");
        }
    }
}

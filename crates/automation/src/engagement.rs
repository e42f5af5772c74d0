//! Pulls engagement metrics for recent posts back from the platforms.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{AutomationError, AutomationStore, PublisherResolver};

/// Posts older than this are no longer synced.
pub const SYNC_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub synced: usize,
    pub failed: usize,
}

pub struct EngagementSync {
    store: Arc<dyn AutomationStore>,
    publishers: Arc<PublisherResolver>,
}

impl EngagementSync {
    pub fn new(store: Arc<dyn AutomationStore>, publishers: Arc<PublisherResolver>) -> Self {
        Self { store, publishers }
    }

    /// Fetch and store metrics for every post from the last week.
    ///
    /// Per-post failures are counted, not returned.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncSummary, AutomationError> {
        let since = Utc::now() - Duration::days(SYNC_WINDOW_DAYS);
        let posts = self.store.recent_posts(since).await?;
        let mut summary = SyncSummary::default();

        for post in posts {
            let Some(platform_id) = post.post_id.as_deref() else {
                continue;
            };

            let metrics = match self.publishers.resolve(post.platform).await {
                Ok(publisher) => publisher.engagement(platform_id).await,
                Err(e) => Err(e),
            };

            match metrics {
                Ok(metrics) => match self.store.save_engagement(post.id, &metrics).await {
                    Ok(()) => summary.synced += 1,
                    Err(e) => {
                        warn!(post = %post.id, "saving engagement failed: {e}");
                        summary.failed += 1;
                    }
                },
                Err(e) => {
                    warn!(post = %post.id, platform = %post.platform, "engagement fetch failed: {e}");
                    summary.failed += 1;
                }
            }
        }

        info!(synced = summary.synced, failed = summary.failed, "engagement sync finished");
        Ok(summary)
    }
}

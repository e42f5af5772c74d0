//! Queue domain types.

use chrono::{DateTime, Utc};
use publishers::Platform;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// QueueStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending    => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed  => write!(f, "completed"),
            Self::Failed     => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending"    => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed"  => Ok(Self::Completed),
            "failed"     => Ok(Self::Failed),
            other        => Err(format!("unknown queue status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// QueueItem
// ---------------------------------------------------------------------------

/// One posting job: publish `article_id` to `platform` at `scheduled_for`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub article_id: Uuid,
    pub platform: Platform,
    /// Higher runs first.
    pub priority: i32,
    pub status: QueueStatus,
    /// Incremented each time the item is claimed.
    pub attempts: u32,
    pub scheduled_for: DateTime<Utc>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Values for a new queue item. Unset fields fall back to priority 0 and "now".
#[derive(Debug, Clone)]
pub struct NewQueueItem {
    pub article_id: Uuid,
    pub platform: Platform,
    pub priority: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl NewQueueItem {
    pub fn new(article_id: Uuid, platform: Platform) -> Self {
        Self { article_id, platform, priority: 0, scheduled_for: None }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn at(mut self, scheduled_for: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(scheduled_for);
        self
    }
}

/// Item counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    /// Whether a processing pass is running right now.
    pub is_processing: bool,
}

impl QueueStats {
    /// Add `count` to the bucket named by `status`.
    pub fn add(&mut self, status: QueueStatus, count: i64) {
        match status {
            QueueStatus::Pending    => self.pending += count,
            QueueStatus::Processing => self.processing += count,
            QueueStatus::Completed  => self.completed += count,
            QueueStatus::Failed     => self.failed += count,
        }
    }

    pub fn total(&self) -> i64 {
        self.pending + self.processing + self.completed + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [QueueStatus::Pending, QueueStatus::Processing, QueueStatus::Completed, QueueStatus::Failed] {
            assert_eq!(status.to_string().parse::<QueueStatus>().unwrap(), status);
        }
        assert!("done".parse::<QueueStatus>().is_err());
    }

    #[test]
    fn new_item_defaults() {
        let item = NewQueueItem::new(Uuid::new_v4(), Platform::Reddit);
        assert_eq!(item.priority, 0);
        assert!(item.scheduled_for.is_none());
    }

    #[test]
    fn stats_serialise_camel_case() {
        let mut stats = QueueStats::default();
        stats.add(QueueStatus::Pending, 2);
        stats.is_processing = true;
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["pending"], 2);
        assert_eq!(json["isProcessing"], true);
        assert_eq!(stats.total(), 2);
    }
}

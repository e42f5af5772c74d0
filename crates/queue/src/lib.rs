//! `queue` crate — the social post queue.
//!
//! Items are per-(article, platform) posting jobs. A worker pulls the due set,
//! claims each item, and then completes, reschedules or fails it according to
//! the [`RetryPolicy`]. Storage sits behind the [`QueueStore`] trait.

pub mod error;
pub mod models;
pub mod retry;
pub mod store;
pub mod memory;

pub use error::QueueError;
pub use models::{NewQueueItem, QueueItem, QueueStats, QueueStatus};
pub use retry::{RetryDecision, RetryPolicy};
pub use store::QueueStore;
pub use memory::InMemoryQueueStore;

/// Items handled per processing pass.
pub const BATCH_SIZE: usize = 10;

/// Completed items older than this many days are removed by cleanup.
pub const DEFAULT_CLEANUP_DAYS: i64 = 7;

//! Queue-level error type.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue item {0} not found")]
    NotFound(Uuid),

    /// The backing store failed; the message comes from the store.
    #[error("queue storage error: {0}")]
    Store(String),

    #[error("invalid queue row: {0}")]
    InvalidRow(String),
}

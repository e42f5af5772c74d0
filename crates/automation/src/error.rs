//! Automation-level error types.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AutomationError {
    /// No article with this id, or it is not published.
    #[error("article {0} not found or not published")]
    ArticleNotFound(Uuid),

    #[error("social post {0} not found")]
    PostNotFound(Uuid),

    /// A stored rule could not be decoded.
    #[error("invalid automation rule: {0}")]
    InvalidRule(String),

    /// A cleanup window that is negative or too large to subtract from now.
    #[error("cleanup window of {0} days is out of range")]
    InvalidRetention(i64),

    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error(transparent)]
    Queue(#[from] queue::QueueError),

    #[error(transparent)]
    Publish(#[from] publishers::PublishError),

    /// A non-Postgres store failed.
    #[error("store error: {0}")]
    Store(String),
}

//! Publisher-level error type.

use thiserror::Error;

/// Errors returned by a publisher.
///
/// The queue processor uses the variant to decide retry behaviour:
/// - `Retryable`     — the item is re-queued with exponential back-off.
/// - `Fatal`         — the item is immediately marked as failed.
/// - `NotConfigured` — treated like `Fatal`; the platform has no usable credentials.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Transient failure; worth another attempt later.
    #[error("{0}")]
    Retryable(String),

    /// Permanent failure; retrying will not help.
    #[error("{0}")]
    Fatal(String),

    #[error("platform {0} is not configured or inactive")]
    NotConfigured(String),
}

impl PublishError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

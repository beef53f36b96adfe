//! Error types for webhook reconciliation.

use keyward_store::StoreError;
use thiserror::Error;

/// Result type for reconciliation.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Why an inbound webhook could not be reconciled.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The signature header is missing, stale, or does not match.
    #[error("webhook signature invalid")]
    InvalidSignature,

    /// The payload is not a well-formed event. Permanent; not retried.
    #[error("malformed webhook payload: {0}")]
    Malformed(String),

    /// The customer lookup failed. Transient.
    #[error("provider lookup failed: {0}")]
    Provider(#[from] ProviderError),

    /// The store failed. Transient.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Whether the same payload could succeed if replayed.
    ///
    /// Events taken from the queue were already acknowledged, so the
    /// provider does not retry them on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Store(_))
    }
}

/// Payment provider API errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("customer not found: {0}")]
    NotFound(String),

    #[error("provider request timed out")]
    Timeout,

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A post-commit hook failed. Logged, never propagated.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification endpoint returned status {0}")]
    Status(u16),
}

/// The reconciliation queue refused an event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("reconciliation queue is full")]
    Full,

    #[error("reconciliation queue is closed")]
    Closed,
}

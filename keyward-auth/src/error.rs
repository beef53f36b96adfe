//! Error types for the auth gate and heartbeat tracker.
//!
//! Credential and entitlement failures are not errors; they are reported
//! through [`keyward_types::AuthResult`]. These enums carry only what the
//! caller cannot act on.

use keyward_store::StoreError;
use thiserror::Error;

/// Result type for [`crate::AuthGate`].
pub type GateResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum HeartbeatError {
    /// Unknown session, or a session owned by someone else.
    #[error("invalid session")]
    InvalidSession,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

//! Core type definitions for Keyward.
//!
//! This crate defines the small vocabulary shared by every other crate:
//! - User and session identifiers (UUID v7)
//! - Packed release versions and OS platform slugs
//! - The authentication result code exchanged with desktop clients
//! - Millisecond wall-clock timestamps

mod auth;
mod ids;
mod time;
mod version;

pub use auth::AuthResult;
pub use ids::{SessionId, UserId};
pub use time::UnixMillis;
pub use version::{Platform, Version};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown auth result code: {0}")]
    UnknownAuthCode(u8),
}

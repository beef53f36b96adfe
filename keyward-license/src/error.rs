//! Error types for license keys.

use thiserror::Error;

/// License key errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LicenseError {
    /// The string is not a well-formed license key.
    #[error("invalid license key format: {0}")]
    InvalidFormat(String),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

//! Error types for update activation.

use crate::swap::SwapState;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A swap that did not complete.
#[derive(Debug, Error)]
pub enum SwapError {
    /// A path that must be a directory is something else. Nothing was
    /// touched.
    #[error("corrupt install: {} exists but is not a directory", path.display())]
    CorruptInstall { path: PathBuf },

    /// The swap failed; the previous binaries are back in place.
    #[error("swap failed and was rolled back: {source}")]
    RolledBack {
        #[source]
        source: io::Error,
    },

    /// The swap failed and so did the rollback. Needs manual repair.
    #[error("swap failed ({source}) and rollback failed ({rollback})")]
    RollbackFailed {
        #[source]
        source: io::Error,
        rollback: io::Error,
    },

    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SwapError {
    /// The terminal state this error leaves the install in.
    #[must_use]
    pub fn state(&self) -> SwapState {
        match self {
            Self::RolledBack { .. } => SwapState::RolledBack,
            Self::CorruptInstall { .. } | Self::RollbackFailed { .. } | Self::Io { .. } => {
                SwapState::Failed
            }
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Staging or verification failed.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("artifact hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Swap(#[from] SwapError),
}

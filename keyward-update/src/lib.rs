//! Autoupdate activation for Keyward desktop installs.
//!
//! An install root looks like:
//!
//! ```text
//! <root>/
//!     keyward-launcher
//!     bin/        active binaries
//!     newbin/     staged update, if any
//!     DELETEME    transient, only during a swap
//! ```
//!
//! The launcher calls [`apply_staged_update`] on every start, before it
//! runs anything under `bin/`. Every step is a single `rename`, so a crash
//! at any point leaves either the old or the new tree in `bin/`, and the
//! next start finishes or undoes the work.

mod error;
mod swap;
mod verify;

pub use error::{SwapError, UpdateError};
pub use swap::{
    apply_staged_update, replace_folder, sentinel_for, stage_update, SwapOutcome, SwapState,
    BIN_DIR, SENTINEL_NAME, STAGED_DIR, STAGING_TMP_DIR,
};
pub use verify::{sha256_file, verify_artifact};

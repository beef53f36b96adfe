//! Rename-based folder replacement.

use crate::error::{SwapError, UpdateError};
use crate::verify::verify_artifact;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Active binaries, relative to the install root.
pub const BIN_DIR: &str = "bin";
/// Staged update, relative to the install root.
pub const STAGED_DIR: &str = "newbin";
/// Where a downloaded update is extracted before it is staged.
pub const STAGING_TMP_DIR: &str = "newbintmp";
/// Holds the replaced tree while a swap is in flight.
pub const SENTINEL_NAME: &str = "DELETEME";

/// Where an install is in the update lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapState {
    NoUpdateStaged,
    /// Between the first rename and the second. Never terminal.
    Swapping,
    Swapped,
    RolledBack,
    /// Manual repair needed. The launcher must not run the app.
    Failed,
}

/// A swap that finished without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapOutcome {
    /// Nothing was staged. Leftovers from an earlier swap may have been
    /// cleaned up.
    NoUpdateStaged,
    /// The staged tree is now active.
    Swapped,
    /// An interrupted swap left only the sentinel; it was moved back.
    Recovered,
}

impl SwapOutcome {
    #[must_use]
    pub fn state(&self) -> SwapState {
        match self {
            Self::NoUpdateStaged => SwapState::NoUpdateStaged,
            Self::Swapped => SwapState::Swapped,
            Self::Recovered => SwapState::RolledBack,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Missing,
    Dir,
    Other,
}

fn entry(path: &Path) -> Result<Entry, SwapError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(Entry::Dir),
        Ok(_) => Ok(Entry::Other),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Entry::Missing),
        Err(e) => Err(SwapError::io(path, e)),
    }
}

/// The sentinel path used when replacing `dst`.
///
/// `bin` uses `DELETEME` next to it. Any other directory gets its own
/// `DELETEME-<name>` so staging never mistakes an interrupted `bin` swap
/// for its own.
#[must_use]
pub fn sentinel_for(dst: &Path) -> PathBuf {
    let name = match dst.file_name().and_then(|n| n.to_str()) {
        Some(BIN_DIR) | None => SENTINEL_NAME.to_string(),
        Some(other) => format!("{SENTINEL_NAME}-{other}"),
    };
    match dst.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Replaces the directory `dst` with the directory `src`.
///
/// `src` missing or not a directory is not an error: there is nothing to
/// apply and `dst` is not inspected. With an update staged, `dst` existing
/// as anything but a directory is [`SwapError::CorruptInstall`] and nothing
/// is touched.
///
/// A sentinel left by an interrupted earlier run is resolved first:
/// - `dst` present: the earlier swap completed; the sentinel is removed
/// - `dst` missing, `src` staged: the earlier swap stopped between its two
///   renames; this run finishes it
/// - `dst` missing, nothing staged: the sentinel is renamed back to `dst`
pub fn replace_folder(src: &Path, dst: &Path) -> Result<SwapOutcome, SwapError> {
    let sentinel = sentinel_for(dst);
    let staged = entry(src)? == Entry::Dir;
    let leftover = entry(&sentinel)?;

    if !staged && leftover == Entry::Missing {
        debug!(path = %src.display(), "no update staged");
        return Ok(SwapOutcome::NoUpdateStaged);
    }

    let current = entry(dst)?;
    if current == Entry::Other {
        return Err(SwapError::CorruptInstall {
            path: dst.to_path_buf(),
        });
    }

    // Whether `sentinel` holds the tree that `dst` had before this swap.
    let mut holds_previous = false;

    match (leftover, current) {
        (Entry::Missing, _) => {}
        (_, Entry::Dir) => {
            info!(path = %sentinel.display(), "removing leftover sentinel");
            remove_sentinel(&sentinel);
        }
        (Entry::Other, _) => {
            return Err(SwapError::CorruptInstall { path: sentinel });
        }
        (Entry::Dir, _) if !staged => {
            warn!(path = %dst.display(), "restoring previous tree from sentinel");
            fs::rename(&sentinel, dst).map_err(|e| SwapError::io(dst, e))?;
            return Ok(SwapOutcome::Recovered);
        }
        (Entry::Dir, _) => {
            warn!(path = %dst.display(), "resuming interrupted swap");
            holds_previous = true;
        }
    }

    if !staged {
        debug!(path = %src.display(), "no update staged");
        return Ok(SwapOutcome::NoUpdateStaged);
    }

    if current == Entry::Dir {
        // Nothing has moved yet, so a failure here leaves the install as it was.
        fs::rename(dst, &sentinel).map_err(|source| SwapError::RolledBack { source })?;
        holds_previous = true;
    }
    debug!(state = ?SwapState::Swapping, from = %src.display(), to = %dst.display(), "swapping");

    if let Err(source) = fs::rename(src, dst) {
        if !holds_previous {
            return Err(SwapError::io(src, source));
        }
        return match fs::rename(&sentinel, dst) {
            Ok(()) => {
                warn!(error = %source, "swap failed; previous tree restored");
                Err(SwapError::RolledBack { source })
            }
            Err(rollback) => Err(SwapError::RollbackFailed { source, rollback }),
        };
    }

    if holds_previous {
        remove_sentinel(&sentinel);
    }
    info!(path = %dst.display(), "swap complete");
    Ok(SwapOutcome::Swapped)
}

/// Best effort. A sentinel that cannot be removed is logged and left.
fn remove_sentinel(sentinel: &Path) {
    let result = match entry(sentinel) {
        Ok(Entry::Dir) => fs::remove_dir_all(sentinel),
        Ok(Entry::Other) => fs::remove_file(sentinel),
        Ok(Entry::Missing) => Ok(()),
        Err(e) => {
            warn!(path = %sentinel.display(), "could not inspect sentinel: {e}");
            return;
        }
    };
    if let Err(e) = result {
        warn!(path = %sentinel.display(), "could not remove sentinel: {e}");
    }
}

/// Activates `install_root/newbin` as `install_root/bin`.
pub fn apply_staged_update(install_root: &Path) -> Result<SwapOutcome, SwapError> {
    replace_folder(&install_root.join(STAGED_DIR), &install_root.join(BIN_DIR))
}

/// Moves an extracted update into `install_root/newbin`.
///
/// When `archive` is given as `(path, sha256)`, the downloaded package is
/// checked first and nothing is staged on a mismatch. A previously staged
/// update is replaced.
pub fn stage_update(
    install_root: &Path,
    extracted_dir: &Path,
    archive: Option<(&Path, &str)>,
) -> Result<SwapOutcome, UpdateError> {
    if let Some((path, expected)) = archive {
        verify_artifact(path, expected)?;
    }
    if entry(extracted_dir)? != Entry::Dir {
        return Err(UpdateError::Io {
            path: extracted_dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "extracted update is not a directory"),
        });
    }
    let outcome = replace_folder(extracted_dir, &install_root.join(STAGED_DIR))?;
    info!(root = %install_root.display(), "update staged");
    Ok(outcome)
}

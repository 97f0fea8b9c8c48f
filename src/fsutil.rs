//! # Filesystem Utilities
//!
//! `mkdir -p` style directory creation and a recursive removal that copes with
//! read-only entries. Removal is best-effort: an entry that still refuses to go
//! after its write bit has been granted is reported as a warning and skipped.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// How many times a removal is retried after granting write permission.
const PERMISSION_RETRIES: usize = 1;

/// Create `path` and any missing ancestors.
///
/// Succeeds as a no-op when `path` already is a directory.
///
/// # Errors
/// Returns [`Error::PathConflict`] if `path` (or an ancestor) exists but is
/// not a directory, and [`Error::Io`] for any other creation failure.
pub fn make_dirs(path: &Path) -> Result<()> {
    if path.is_dir() {
        debug!("{} already exists", path.display());
        return Ok(());
    }
    if path.exists() {
        return Err(Error::PathConflict {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            make_dirs(parent)?;
        }
    }

    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        // Another process may have created it since the check above
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(Error::PathConflict {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Remove `path` and everything beneath it.
///
/// # Arguments
/// * `path` - The directory (or file) to remove.
/// * `ignore_missing` - Succeed silently when `path` does not exist.
///
/// # Errors
/// Permission failures that survive one write-bit retry are logged and
/// skipped. Any other I/O error aborts the removal.
pub fn remove_tree(path: &Path, ignore_missing: bool) -> Result<()> {
    debug!("Removing directory tree {}", path.display());
    match fs::symlink_metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound && ignore_missing => Ok(()),
        Err(e) => Err(e.into()),
        Ok(_) => remove_entry(path).map_err(Error::from),
    }
}

fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if !meta.is_dir() {
        return with_permission_retry(path, |p| fs::remove_file(p));
    }

    let entries = match fs::read_dir(path) {
        Err(e) if is_permission_error(&e) => {
            grant_write(path);
            match fs::read_dir(path) {
                Err(e) if is_permission_error(&e) => {
                    warn!(
                        "Unable to list directory due to permissions restriction: {}",
                        path.display()
                    );
                    return Ok(());
                }
                other => other?,
            }
        }
        other => other?,
    };
    for entry in entries {
        remove_entry(&entry?.path())?;
    }
    with_permission_retry(path, |p| fs::remove_dir(p))
}

/// Attempt `remove`, granting write permission and retrying on a permission
/// error. A permission error on the final attempt is downgraded to a warning.
fn with_permission_retry(path: &Path, remove: fn(&Path) -> io::Result<()>) -> io::Result<()> {
    let mut attempt = 0;
    loop {
        match remove(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) if is_permission_error(&e) && attempt < PERMISSION_RETRIES => {
                attempt += 1;
                // Unlinking needs write access on the parent, not only the entry
                grant_write(path);
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    grant_write(parent);
                }
            }
            Err(e) if is_permission_error(&e) => {
                warn!(
                    "Unable to remove file due to permissions restriction: {}",
                    path.display()
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_permission_error(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::PermissionDenied
}

fn grant_write(path: &Path) {
    if let Err(e) = set_write_bit(path) {
        debug!("Could not make {} writable: {e}", path.display());
    }
}

/// Grant the owner write access (and traversal, for directories).
fn set_write_bit(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) if !meta.file_type().is_symlink() => meta,
        _ => return Ok(()),
    };
    let mut perms = meta.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let extra = if meta.is_dir() { 0o700 } else { 0o600 };
        perms.set_mode(perms.mode() | extra);
    }
    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);

    fs::set_permissions(path, perms)
}

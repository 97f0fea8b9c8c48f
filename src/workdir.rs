//! Scoped working-directory changes.
//!
//! The working directory is process-wide state, so guards must not be used
//! from more than one thread at a time. Nested guards unwind in order: each
//! one restores the directory that was current when it was created.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// Restores the previous working directory when dropped.
#[derive(Debug)]
#[must_use = "the previous directory is restored as soon as the guard is dropped"]
pub struct WorkDir {
    previous: Option<PathBuf>,
}

impl WorkDir {
    /// Change into `path` until the returned guard goes out of scope.
    ///
    /// An empty path yields a guard that changes nothing.
    pub fn enter(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(Self { previous: None });
        }
        let previous = env::current_dir()?;
        env::set_current_dir(path)?;
        debug!("Entered {}", path.display());
        Ok(Self {
            previous: Some(previous),
        })
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = env::set_current_dir(&previous) {
                warn!("Failed to return to {}: {e}", previous.display());
            }
        }
    }
}

/// Run `f` with `path` as the working directory.
pub fn within<T>(path: impl AsRef<Path>, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _guard = WorkDir::enter(path)?;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serial_test::serial;
    use std::fs;

    fn cwd() -> PathBuf {
        fs::canonicalize(env::current_dir().unwrap()).unwrap()
    }

    #[test]
    #[serial]
    fn nested_guards_restore_in_order() {
        let outer = tempfile::tempdir().unwrap();
        let inner = tempfile::tempdir().unwrap();
        let start = cwd();

        {
            let _outer = WorkDir::enter(outer.path()).unwrap();
            assert_eq!(cwd(), fs::canonicalize(outer.path()).unwrap());
            {
                let _inner = WorkDir::enter(inner.path()).unwrap();
                assert_eq!(cwd(), fs::canonicalize(inner.path()).unwrap());
            }
            assert_eq!(cwd(), fs::canonicalize(outer.path()).unwrap());
        }
        assert_eq!(cwd(), start);
    }

    #[test]
    #[serial]
    fn restores_after_error() {
        let dir = tempfile::tempdir().unwrap();
        let start = cwd();

        let result: Result<()> = within(dir.path(), || {
            within("", || Err(Error::Argument("boom".into())))
        });
        assert!(matches!(result, Err(Error::Argument(_))));
        assert_eq!(cwd(), start);
    }

    #[test]
    #[serial]
    fn empty_path_is_noop() {
        let start = cwd();
        let guard = WorkDir::enter("").unwrap();
        assert_eq!(cwd(), start);
        drop(guard);
        assert_eq!(cwd(), start);
    }

    #[test]
    #[serial]
    fn missing_directory_fails_without_moving() {
        let start = cwd();
        assert!(WorkDir::enter("/definitely/not/here").is_err());
        assert_eq!(cwd(), start);
    }
}

//! # Error Types for provision
//!
//! Every failure an adapter can signal to the dispatcher is a variant of
//! [`Error`]. Plumbing failures without a dedicated variant (config parsing,
//! HTTP, JSON) are carried through [`Error::Other`] with `anyhow` context.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A required external tool (apt, git, hg, ...) is not on the search path.
    #[error("executable not found: {program}")]
    ExecutableNotFound { program: String },

    /// A child process exited non-zero and the caller required success.
    #[error("command `{command}` failed with exit code {code}")]
    CommandFailed { code: i32, command: String },

    /// A command string could not be split into words.
    #[error("cannot parse command `{command}`: {reason}")]
    InvalidCommand { command: String, reason: String },

    /// The target of a directory creation is occupied by something else.
    #[error("a file with the same name as the desired dir, '{}', already exists", path.display())]
    PathConflict { path: PathBuf },

    /// The program is already on the search path; not a failure unless forced.
    #[error("{program} already exists at {}. Skipping install!", path.display())]
    AlreadyInstalled { program: String, path: PathBuf },

    #[error("GitHub token file not found or unreadable: {}", path.display())]
    TokenMissing { path: PathBuf },

    #[error("no packages supplied and no package list found at {}", path.display())]
    NoPackagesSpecified { path: PathBuf },

    #[error("repo '{repo}' has no release assets")]
    NoAssets { repo: String },

    #[error("no installer is registered for '{name}'")]
    UnknownProgram { name: String },

    #[error("apt is not installed on this system")]
    ManagerNotInstalled,

    #[error("{program} build failed during {step}")]
    BuildFailed { program: String, step: String },

    #[error("user input canceled")]
    SelectionCancelled,

    #[error("{0}")]
    Argument(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether this error only reports a skipped action.
    pub fn is_skip(&self) -> bool {
        matches!(self, Error::AlreadyInstalled { .. })
    }

    /// Process exit status the dispatcher reports for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::AlreadyInstalled { .. } => 0,
            Error::Argument(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_class() {
        let skip = Error::AlreadyInstalled {
            program: "tmux".into(),
            path: PathBuf::from("/usr/bin/tmux"),
        };
        assert!(skip.is_skip());
        assert_eq!(skip.exit_code(), 0);
        assert_eq!(Error::Argument("bad".into()).exit_code(), 2);
        assert_eq!(Error::ManagerNotInstalled.exit_code(), 1);
        assert_eq!(Error::SelectionCancelled.exit_code(), 1);
        assert!(!Error::NoAssets { repo: "x/y".into() }.is_skip());
    }

    #[test]
    fn command_failure_names_command_and_code() {
        let err = Error::CommandFailed {
            code: 2,
            command: "make install".into(),
        };
        assert_eq!(err.to_string(), "command `make install` failed with exit code 2");
    }
}

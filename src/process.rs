//! # Process Runner
//!
//! Wraps external command invocation. A command is built either from an
//! explicit argument list or from a single string, which is split with shell
//! word rules (quotes respected) but never handed to a shell: the words go
//! straight to the OS exec, so no globbing, expansion or piping happens.
//!
//! Adapters talk to the system through the [`Shell`] trait, which keeps them
//! runnable against a recording fake in tests.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// A single command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    capture: bool,
    check: bool,
}

impl Invocation {
    /// Build an invocation from an explicit argument list.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
            capture: false,
            check: false,
        }
    }

    /// Build an invocation by splitting `command` into words.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCommand`] for unbalanced quotes or an empty
    /// command.
    pub fn parse(command: &str) -> Result<Self> {
        let argv = shell_words::split(command).map_err(|e| Error::InvalidCommand {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
        if argv.is_empty() {
            return Err(Error::InvalidCommand {
                command: command.to_string(),
                reason: "empty command".to_string(),
            });
        }
        Ok(Self::new(argv))
    }

    /// Run in `dir` instead of the current working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Capture stdout/stderr instead of inheriting the parent's streams.
    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Fail with [`Error::CommandFailed`] on a non-zero exit code.
    pub fn check(mut self) -> Self {
        self.check = true;
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn is_captured(&self) -> bool {
        self.capture
    }

    pub fn is_checked(&self) -> bool {
        self.check
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::join(&self.argv))
    }
}

/// Result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// The system seam every adapter goes through.
pub trait Shell {
    /// Execute the invocation and wait for it to exit.
    fn run(&mut self, invocation: &Invocation) -> Result<Output>;

    /// Locate an executable on the search path.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Split `command` into words and run it, requiring success.
    fn exec(&mut self, command: &str) -> Result<Output> {
        self.run(&Invocation::parse(command)?.check())
    }
}

/// Runs commands as real OS processes.
#[derive(Debug, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&mut self, invocation: &Invocation) -> Result<Output> {
        let (program, args) = invocation
            .argv()
            .split_first()
            .ok_or_else(|| Error::InvalidCommand {
                command: String::new(),
                reason: "empty command".to_string(),
            })?;
        debug!("Cmd: {invocation}");

        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = invocation.working_dir() {
            command.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }

        let not_found = |e: io::Error| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::ExecutableNotFound {
                    program: invocation.program().to_string(),
                }
            } else {
                Error::Io(e)
            }
        };

        let output = if invocation.is_captured() {
            let out = command
                .stdin(Stdio::inherit())
                .output()
                .map_err(not_found)?;
            Output {
                code: out.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            }
        } else {
            // Inherit the standard streams so sudo prompts reach the terminal
            let status = command.status().map_err(not_found)?;
            Output {
                code: status.code().unwrap_or(-1),
                ..Output::default()
            }
        };

        debug!("Exit code {} for `{invocation}`", output.code);
        if !output.stderr.is_empty() {
            debug!("stderr: {}", output.stderr.trim_end());
        }
        if invocation.is_checked() && !output.success() {
            return Err(Error::CommandFailed {
                code: output.code,
                command: invocation.to_string(),
            });
        }
        Ok(output)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::fsutil;
use crate::process::{Invocation, Output, Shell};

/// Records every invocation instead of spawning it.
///
/// Commands answer with a zero exit code unless a response was scripted for
/// their rendered command line. `git clone` / `hg clone` create the target
/// directory so build steps can enter it.
#[derive(Debug, Default)]
pub struct FakeShell {
    pub calls: Vec<String>,
    pub installed: HashSet<String>,
    responses: HashMap<String, Output>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `program` is on the search path.
    pub fn with_installed(mut self, program: &str) -> Self {
        self.installed.insert(program.to_string());
        self
    }

    /// Script the result of `command`.
    pub fn respond(mut self, command: &str, code: i32, stdout: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            Output {
                code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
        self
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == command).count()
    }

    pub fn called_any(&self, prefix: &str) -> bool {
        self.calls.iter().any(|c| c.starts_with(prefix))
    }
}

impl Shell for FakeShell {
    fn run(&mut self, invocation: &Invocation) -> Result<Output> {
        let rendered = invocation.to_string();
        self.calls.push(rendered.clone());

        let argv = invocation.argv();
        if argv.len() >= 4 && matches!(argv[0].as_str(), "git" | "hg") && argv[1] == "clone" {
            if let Some(dest) = argv.last() {
                fsutil::make_dirs(&PathBuf::from(dest))?;
            }
        }

        let output = self.responses.get(&rendered).cloned().unwrap_or_default();
        if invocation.is_checked() && !output.success() {
            return Err(Error::CommandFailed {
                code: output.code,
                command: rendered,
            });
        }
        Ok(output)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.installed
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}

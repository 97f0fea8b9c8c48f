//! # apt Package Manager Adapter
//!
//! Drives `apt` through a [`Shell`]. An [`AptSession`] remembers whether the
//! package index has been refreshed, so however many operations run in one
//! session, `apt update` is executed at most once.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::process::{Invocation, Shell};

const REFRESH: &str = "sudo apt update -y";

/// State carried across apt operations of one run.
#[derive(Debug, Clone)]
pub struct AptSession {
    fresh: bool,
    package_list: PathBuf,
}

impl AptSession {
    /// Start a session whose fallback package list lives at `package_list`.
    pub fn new(package_list: impl Into<PathBuf>) -> Self {
        Self {
            fresh: false,
            package_list: package_list.into(),
        }
    }

    /// Whether the package index was refreshed in this session.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Mark the index stale so the next operation refreshes it again.
    pub fn reset(&mut self) {
        self.fresh = false;
    }

    /// Refresh the package index unless this session already did.
    pub fn refresh(&mut self, shell: &mut dyn Shell) -> Result<()> {
        debug!("Apt cache updated: {}", self.is_fresh());
        if !self.fresh {
            shell.exec(REFRESH)?;
            self.fresh = true;
        }
        Ok(())
    }

    /// Names of the packages with pending upgrades.
    pub fn upgradable(&mut self, shell: &mut dyn Shell) -> Result<Vec<String>> {
        self.refresh(shell)?;
        let output = shell.run(&Invocation::parse("apt list --upgradable")?.capture().check())?;
        Ok(output
            .stdout
            .lines()
            .filter(|line| line.contains('/'))
            .filter_map(|line| line.split('/').next())
            .map(str::to_string)
            .collect())
    }

    /// Apply all pending upgrades.
    pub fn full_upgrade(&mut self, shell: &mut dyn Shell) -> Result<()> {
        self.refresh(shell)?;
        shell.exec("sudo apt full-upgrade -y")?;
        Ok(())
    }

    /// Apply all pending upgrades, then install `packages` if any were given.
    ///
    /// Unlike [`AptSession::install`], an empty `packages` does not fall back
    /// to the package list.
    pub fn upgrade(&mut self, shell: &mut dyn Shell, packages: &[String]) -> Result<()> {
        self.full_upgrade(shell)?;
        if !packages.is_empty() {
            self.install(shell, packages)?;
        }
        Ok(())
    }

    /// Install `packages`, or the fallback package list when none are given.
    ///
    /// # Errors
    /// - [`Error::ManagerNotInstalled`] if `apt-get` is not on the search path.
    /// - [`Error::NoPackagesSpecified`] if neither source yields a package.
    /// - Any runner error from the refresh or the install command.
    pub fn install(&mut self, shell: &mut dyn Shell, packages: &[String]) -> Result<Vec<String>> {
        if shell.locate("apt-get").is_none() {
            return Err(Error::ManagerNotInstalled);
        }

        let packages = if packages.is_empty() {
            info!("No pkgs supplied; getting apt pkgs from disk");
            read_package_list(&self.package_list)?
        } else {
            packages.to_vec()
        };

        self.refresh(shell)?;
        let argv = ["sudo", "apt", "install", "-y"]
            .into_iter()
            .map(str::to_string)
            .chain(packages.iter().cloned());
        shell.run(&Invocation::new(argv).check())?;
        Ok(packages)
    }

    /// Full maintenance pass: upgrade, install, then clear out stale packages.
    ///
    /// A missing package list is tolerated here; the maintenance commands run
    /// regardless.
    pub fn update(&mut self, shell: &mut dyn Shell, packages: &[String]) -> Result<()> {
        self.full_upgrade(shell)?;
        match self.install(shell, packages) {
            Ok(_) => {}
            Err(Error::NoPackagesSpecified { path }) => {
                info!("No extra packages to install (looked in {})", path.display());
            }
            Err(e) => return Err(e),
        }
        shell.exec("sudo apt autoremove --purge -y")?;
        shell.exec("sudo apt autoclean -y")?;
        Ok(())
    }
}

/// Read one package name per line, skipping blanks and `#` comments.
pub fn read_package_list(path: &Path) -> Result<Vec<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NoPackagesSpecified {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let packages: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if packages.is_empty() {
        return Err(Error::NoPackagesSpecified {
            path: path.to_path_buf(),
        });
    }
    Ok(packages)
}

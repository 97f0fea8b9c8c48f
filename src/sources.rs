//! # Source Installer Registry
//!
//! Programs that are built from their upstream sources. Each [`Recipe`]
//! follows the same protocol:
//!
//! 1. Skip with [`Error::AlreadyInstalled`] when the binary is already on the
//!    search path (unless forced).
//! 2. Install build dependencies through the apt session.
//! 3. Clone into a fresh scratch directory, optionally checking out the
//!    latest tag.
//! 4. Run the program's build steps inside that directory.
//! 5. Remove the scratch directory, whatever happened above.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::apt::AptSession;
use crate::error::{Error, Result};
use crate::fsutil::{make_dirs, remove_tree};
use crate::process::{Invocation, Shell};
use crate::workdir::{WorkDir, within};

/// Where a program's sources come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Git(&'static str),
    Hg(&'static str),
}

impl Source {
    fn clone_into(&self, dest: &Path) -> Invocation {
        let (vcs, url) = match *self {
            Source::Git(url) => ("git", url),
            Source::Hg(url) => ("hg", url),
        };
        let dest = dest.to_string_lossy();
        Invocation::new([vcs, "clone", url, &*dest]).check()
    }
}

/// Build steps run with the checkout as the working directory.
pub type BuildFn = fn(&mut dyn Shell, &Recipe) -> Result<()>;

/// How one program is fetched, built and installed.
#[derive(Debug, Clone, Copy)]
pub struct Recipe {
    /// Name used on the command line.
    pub name: &'static str,
    /// Executable that signals the program is already installed.
    pub binary: &'static str,
    pub source: Source,
    /// apt packages needed to build.
    pub deps: &'static [&'static str],
    /// Check out the newest tag before building.
    pub latest_tag: bool,
    pub build: BuildFn,
}

/// Everything a recipe needs from the running command.
pub struct Job<'a> {
    pub shell: &'a mut dyn Shell,
    pub apt: &'a mut AptSession,
    pub scratch_dir: &'a Path,
    pub force: bool,
}

impl Recipe {
    /// Run the full install protocol for this program.
    pub fn install(&self, job: &mut Job<'_>) -> Result<()> {
        if !job.force {
            if let Some(path) = job.shell.locate(self.binary) {
                return Err(Error::AlreadyInstalled {
                    program: self.binary.to_string(),
                    path,
                });
            }
        }

        if !self.deps.is_empty() {
            let deps: Vec<String> = self.deps.iter().map(|d| d.to_string()).collect();
            job.apt.install(job.shell, &deps)?;
        }

        let scratch = ScratchDir::fresh(job.scratch_dir.join(self.name))?;
        job.shell.run(&self.source.clone_into(scratch.path()))?;

        within(scratch.path(), || {
            if self.latest_tag {
                checkout_latest_tag(job.shell, self)?;
            }
            (self.build)(job.shell, self)
        })?;

        info!("{} installed", self.name);
        Ok(())
    }
}

/// A temporary build directory, removed when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Clear out leftovers from an earlier attempt and claim `path`.
    pub fn fresh(path: PathBuf) -> Result<Self> {
        remove_tree(&path, true)?;
        if let Some(parent) = path.parent() {
            make_dirs(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        debug!("Cleaning up temp directories...");
        if let Err(e) = remove_tree(&self.path, true) {
            warn!("Failed to remove {}: {e}", self.path.display());
        }
    }
}

/// The newest tag by version sort, if the repository has any.
pub fn latest_tag(shell: &mut dyn Shell) -> Result<Option<String>> {
    let output = shell.run(
        &Invocation::parse("git tag --list --sort=-version:refname")?
            .capture()
            .check(),
    )?;
    Ok(output
        .stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string))
}

fn checkout_latest_tag(shell: &mut dyn Shell, recipe: &Recipe) -> Result<()> {
    let Some(tag) = latest_tag(shell)? else {
        warn!("{} has no tags; building the default branch", recipe.name);
        return Ok(());
    };
    info!("Checking out most recent {} release: {tag}", recipe.name);
    if !shell.run(&Invocation::new(["git", "checkout", tag.as_str()]))?.success() {
        error!("Checkout for latest version of `{}` failed", recipe.name);
        return Err(build_failed(recipe, "checkout"));
    }
    Ok(())
}

fn build_failed(recipe: &Recipe, step: &str) -> Error {
    Error::BuildFailed {
        program: recipe.name.to_string(),
        step: step.to_string(),
    }
}

/// Run a configure-like step; a non-zero exit aborts the build.
fn configure(shell: &mut dyn Shell, recipe: &Recipe, command: &str) -> Result<()> {
    if shell.run(&Invocation::parse(command)?)?.success() {
        debug!("{} build configured", recipe.name);
        Ok(())
    } else {
        error!("{} build configure failed!", recipe.name);
        Err(build_failed(recipe, "configure"))
    }
}

fn make_and_install(shell: &mut dyn Shell, recipe: &Recipe) -> Result<()> {
    shell.exec("make")?;
    debug!("Installing {}...", recipe.name);
    shell.exec("sudo make install")?;
    Ok(())
}

fn build_ctags(shell: &mut dyn Shell, recipe: &Recipe) -> Result<()> {
    shell.exec("./autogen.sh")?;
    configure(shell, recipe, "./configure")?;
    make_and_install(shell, recipe)
}

fn build_fish(shell: &mut dyn Shell, recipe: &Recipe) -> Result<()> {
    make_dirs(Path::new("build"))?;
    let _build = WorkDir::enter("build")?;
    configure(shell, recipe, "cmake ..")?;
    make_and_install(shell, recipe)
}

fn build_autotools(shell: &mut dyn Shell, recipe: &Recipe) -> Result<()> {
    shell.exec("sh autogen.sh")?;
    configure(shell, recipe, "./configure")?;
    make_and_install(shell, recipe)
}

fn build_neovim(shell: &mut dyn Shell, recipe: &Recipe) -> Result<()> {
    info!("Building dependencies...");
    make_dirs(Path::new(".deps"))?;
    within(".deps", || {
        configure(shell, recipe, "cmake ../third-party")?;
        shell.exec("make")?;
        Ok(())
    })?;

    info!("Building {}...", recipe.name);
    shell.exec("make distclean")?;
    shell.exec("make CMAKE_BUILD_TYPE=RelWithDebInfo")?;
    shell.exec("sudo make install")?;
    Ok(())
}

fn build_vcprompt(shell: &mut dyn Shell, recipe: &Recipe) -> Result<()> {
    shell.exec("autoconf")?;
    configure(shell, recipe, "./configure")?;
    make_and_install(shell, recipe)
}

/// Every program `provision install` knows, in command-line order.
pub static RECIPES: &[Recipe] = &[
    Recipe {
        name: "ctags",
        binary: "ctags",
        source: Source::Git("https://github.com/universal-ctags/ctags.git"),
        deps: &["autoconf", "automake", "pkg-config"],
        latest_tag: false,
        build: build_ctags,
    },
    Recipe {
        name: "fish",
        binary: "fish",
        source: Source::Git("https://github.com/fish-shell/fish-shell.git"),
        deps: &[
            "build-essential",
            "ncurses-dev",
            "libncurses5-dev",
            "gettext",
            "autoconf",
            "doxygen",
        ],
        latest_tag: false,
        build: build_fish,
    },
    Recipe {
        name: "lpass",
        binary: "lpass",
        source: Source::Git("https://github.com/lastpass/lastpass-cli.git"),
        deps: &[
            "bash-completion",
            "build-essential",
            "cmake",
            "libcurl4",
            "libcurl4-openssl-dev",
            "libssl-dev",
            "libxml2",
            "libxml2-dev",
            "pkg-config",
            "ca-certificates",
            "xclip",
        ],
        latest_tag: false,
        build: make_and_install,
    },
    Recipe {
        name: "mosh",
        binary: "mosh",
        source: Source::Git("https://github.com/mobile-shell/mosh.git"),
        deps: &[
            "protobuf-compiler",
            "libprotobuf-dev",
            "libutempter-dev",
            "libboost-dev",
            "libio-pty-perl",
            "libssl-dev",
            "pkg-config",
            "autoconf",
        ],
        latest_tag: false,
        build: build_autotools,
    },
    Recipe {
        name: "neovim",
        binary: "nvim",
        source: Source::Git("https://github.com/neovim/neovim.git"),
        deps: &[
            "gperf",
            "libluajit-5.1-dev",
            "libunibilium-dev",
            "libmsgpack-dev",
            "libtermkey-dev",
            "libvterm-dev",
            "libjemalloc-dev",
        ],
        latest_tag: false,
        build: build_neovim,
    },
    Recipe {
        name: "nnn",
        binary: "nnn",
        source: Source::Git("https://github.com/jarun/nnn.git"),
        deps: &["pkg-config", "libncursesw5-dev"],
        latest_tag: true,
        build: make_and_install,
    },
    Recipe {
        name: "tmux",
        binary: "tmux",
        source: Source::Git("https://github.com/tmux/tmux.git"),
        deps: &[
            "git",
            "automake",
            "build-essential",
            "pkg-config",
            "libevent-dev",
            "libncurses5-dev",
        ],
        latest_tag: true,
        build: build_autotools,
    },
    Recipe {
        name: "todo",
        binary: "todo.sh",
        source: Source::Git("https://github.com/todotxt/todo.txt-cli.git"),
        deps: &[],
        latest_tag: false,
        build: make_and_install,
    },
    Recipe {
        name: "vcprompt",
        binary: "vcprompt",
        source: Source::Hg("https://bitbucket.org/gward/vcprompt"),
        deps: &["mercurial", "autoconf"],
        latest_tag: false,
        build: build_vcprompt,
    },
];

/// Name-to-recipe lookup.
#[derive(Debug, Clone, Copy)]
pub struct Registry<'r> {
    recipes: &'r [Recipe],
}

impl Default for Registry<'static> {
    fn default() -> Self {
        Self::new(RECIPES)
    }
}

impl<'r> Registry<'r> {
    pub fn new(recipes: &'r [Recipe]) -> Self {
        Self { recipes }
    }

    /// Known program names, in registration order.
    pub fn names(&self) -> Vec<&'r str> {
        self.recipes.iter().map(|r| r.name).collect()
    }

    pub fn get(&self, name: &str) -> Result<&'r Recipe> {
        self.recipes
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::UnknownProgram {
                name: name.to_string(),
            })
    }

    /// Look up `name` and run its install protocol.
    pub fn install(&self, name: &str, job: &mut Job<'_>) -> Result<()> {
        let recipe = self.get(name)?;
        debug!("Calling installer for '{name}'");
        recipe.install(job)
    }
}

/// Help text listing every installable program.
pub fn program_list() -> String {
    let mut text = String::from("Programs that can be built and installed:\n");
    for recipe in RECIPES {
        text.push_str(&format!("  {:<10} ({})\n", recipe.name, recipe.binary));
    }
    text
}

//! # Configuration for provision
//!
//! Settings come from an optional `config.toml`. Every key has a default, so
//! the file only needs the values a machine wants to change. Paths may start
//! with `~`, which is expanded against the user's home directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// User settings consumed by the adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Fallback apt package list, one package per line.
    pub package_list: PathBuf,
    /// File holding the GitHub access token.
    pub token_file: PathBuf,
    /// Repositories with this file at their root are not bulk cloned.
    pub opt_out_marker: String,
    /// Where bulk clones land.
    pub clone_root: PathBuf,
    /// Parent of the per-program temporary build directories.
    pub scratch_dir: PathBuf,
    /// Where release assets are downloaded to.
    pub download_dir: PathBuf,
    /// Owner used to expand short repository names.
    pub github_user: Option<String>,
    /// Base URL of the GitHub REST API.
    pub api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_list: PathBuf::from("~/.config/shell/provision/apt_package"),
            token_file: PathBuf::from("~/.github_token"),
            opt_out_marker: ".provision_ignore".to_string(),
            clone_root: PathBuf::from("~/git"),
            scratch_dir: std::env::temp_dir(),
            download_dir: PathBuf::from("."),
            github_user: None,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("provision").join("config.toml"))
    }

    /// Load settings from `explicit`, or from [`Config::default_path`].
    ///
    /// A missing default file yields the built-in defaults; a missing explicit
    /// file is an error.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read.
    /// - TOML parsing fails.
    /// - `api_url` is not an http(s) URL.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match (explicit, Self::default_path()) {
            (Some(path), _) => Self::from_file(path)?,
            (None, Some(path)) if path.is_file() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.expanded()
    }

    fn from_file(path: &Path) -> Result<Self> {
        // Read the TOML file into a string
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML from {}", path.display()))
    }

    fn expanded(mut self) -> Result<Self> {
        validate_api_url(&self.api_url)
            .with_context(|| format!("Invalid api_url: {}", self.api_url))?;

        for path in [
            &mut self.package_list,
            &mut self.token_file,
            &mut self.clone_root,
            &mut self.scratch_dir,
            &mut self.download_dir,
        ] {
            *path = expand_home(path);
        }
        Ok(self)
    }
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn validate_api_url(uri: &str) -> Result<()> {
    let parsed = Url::parse(uri).with_context(|| format!("Failed to parse URI: {uri}"))?;

    if !["http", "https"].contains(&parsed.scheme()) {
        anyhow::bail!("Unsupported scheme: {}", parsed.scheme());
    }
    Ok(())
}

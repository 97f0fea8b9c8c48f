//! # GitHub Adapter
//!
//! Talks to the GitHub REST API with a personal access token and turns the
//! answers into `git clone` invocations or release downloads. The HTTP side
//! sits behind the [`RepoHost`] trait so the cloning and selection logic can
//! run against canned data.

use anyhow::Context;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::fsutil::make_dirs;
use crate::process::{Invocation, Shell};

/// Download buffer size.
pub const CHUNK_SIZE: usize = 8 * 1024;

const PER_PAGE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub ssh_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
}

/// The remote operations the adapter needs.
pub trait RepoHost {
    /// Login of the token's owner.
    fn login(&self) -> Result<String>;

    /// Every repository owned by the authenticated user.
    fn repositories(&self) -> Result<Vec<Repository>>;

    /// File and directory names at the repository root.
    fn root_entries(&self, repo: &Repository) -> Result<Vec<String>>;

    /// The most recent release of `full_name` (`owner/name`), if any.
    fn latest_release(&self, full_name: &str) -> Result<Option<Release>>;
}

/// Read the access token, dropping the trailing newline.
///
/// # Errors
/// Returns [`Error::TokenMissing`] if the file is absent, unreadable or empty.
pub fn read_token(path: &Path) -> Result<String> {
    let token = fs::read_to_string(path)
        .map(|t| t.trim_end_matches(['\r', '\n']).to_string())
        .map_err(|e| {
            debug!("Reading {} failed: {e}", path.display());
            Error::TokenMissing {
                path: path.to_path_buf(),
            }
        })?;
    if token.trim().is_empty() {
        return Err(Error::TokenMissing {
            path: path.to_path_buf(),
        });
    }
    Ok(token)
}

/// A blocking GitHub API client.
pub struct GitHub {
    client: Client,
    api: Url,
}

impl GitHub {
    /// Build a client for `api_url` authenticated with `token`.
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let mut api =
            Url::parse(api_url).with_context(|| format!("Failed to parse URI: {api_url}"))?;
        if !api.path().ends_with('/') {
            api.set_path(&format!("{}/", api.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("provision"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        let mut auth = HeaderValue::from_str(&format!("token {token}"))
            .context("GitHub token contains invalid characters")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to build client")?;
        Ok(Self { client, api })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self
            .api
            .join(path)
            .with_context(|| format!("Invalid API path: {path}"))?)
    }

    /// GET `path` and decode the body; `None` on 404.
    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.endpoint(path)?;
        debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("Failed to send request to {url}"))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response
            .error_for_status()
            .with_context(|| format!("Bad response from {url}"))?
            .json()
            .with_context(|| format!("Failed to decode response from {url}"))?;
        Ok(Some(body))
    }

    /// Stream `asset` into `dest_dir` in [`CHUNK_SIZE`] pieces.
    pub fn download(&self, asset: &Asset, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = Path::new(&asset.name)
            .file_name()
            .with_context(|| format!("Asset has no usable file name: {}", asset.name))?;
        make_dirs(dest_dir)?;
        let dest = dest_dir.join(file_name);
        println!("Downloading to {}...", dest.display());

        let mut response = self
            .client
            .get(&asset.browser_download_url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .context("Failed to send request for asset")?
            .error_for_status()
            .context("Bad response for asset download")?;
        debug!("Request response: {}", response.status());

        let progress = match response.content_length() {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "[{elapsed_precise}] {msg} [{wide_bar:.bold.cyan}] {bytes}/{total_bytes}",
                        )
                        .context("Invalid progress template")?
                        .progress_chars("##-"),
                );
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        progress.set_message(asset.name.clone());

        let mut file = File::create(&dest)?;
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let read = response.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            file.write_all(&chunk[..read])?;
            progress.inc(read as u64);
        }
        file.flush()?;

        progress.finish_with_message(format!(
            "{} {}",
            "✓".green().bold(),
            format!("Downloaded {}", asset.name).green()
        ));
        Ok(dest)
    }
}

impl RepoHost for GitHub {
    fn login(&self) -> Result<String> {
        let user: Option<User> = self.get_json("user")?;
        Ok(user.context("Authenticated user not found")?.login)
    }

    fn repositories(&self) -> Result<Vec<Repository>> {
        let mut repos = Vec::new();
        for page in 1.. {
            let batch: Vec<Repository> = self
                .get_json(&format!(
                    "user/repos?affiliation=owner&per_page={PER_PAGE}&page={page}"
                ))?
                .unwrap_or_default();
            let done = batch.len() < PER_PAGE;
            repos.extend(batch);
            if done {
                break;
            }
        }
        Ok(repos)
    }

    fn root_entries(&self, repo: &Repository) -> Result<Vec<String>> {
        // Empty repositories answer 404
        let entries: Vec<ContentEntry> = self
            .get_json(&format!("repos/{}/contents/", repo.full_name))?
            .unwrap_or_default();
        Ok(entries.into_iter().map(|e| e.name).collect())
    }

    fn latest_release(&self, full_name: &str) -> Result<Option<Release>> {
        let releases: Vec<Release> = self
            .get_json(&format!("repos/{full_name}/releases?per_page=1"))?
            .unwrap_or_default();
        Ok(releases.into_iter().next())
    }
}

/// Expand a short repository name to an SSH clone URL.
///
/// Names that already look like URLs are returned unchanged.
pub fn clone_url(repo: &str, user: &str) -> String {
    if repo.starts_with("git@") || repo.starts_with("http") {
        repo.to_string()
    } else {
        format!("git@github.com:{user}/{repo}.git")
    }
}

/// Directory name a clone of `url` lands in.
pub fn repo_dir_name(url: &str) -> &str {
    let tail = url.trim_end_matches('/').rsplit(['/', ':']).next().unwrap_or(url);
    tail.strip_suffix(".git").unwrap_or(tail)
}

/// Clone `url` into `dest_root`.
///
/// Returns `false` when the destination already exists and nothing was done.
pub fn clone_repo(shell: &mut dyn Shell, url: &str, dest_root: &Path) -> Result<bool> {
    if shell.locate("git").is_none() {
        return Err(Error::ExecutableNotFound {
            program: "git".to_string(),
        });
    }
    let dest_root = std::path::absolute(dest_root)?;
    let dest = dest_root.join(repo_dir_name(url));
    if dest.exists() {
        warn!("{} already exists. Skipping clone!", dest.display());
        return Ok(false);
    }

    make_dirs(&dest_root)?;
    let dest = dest.to_string_lossy();
    shell.run(
        &Invocation::new(["git", "clone", "--recursive", url, &*dest])
            .cwd(&dest_root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .check(),
    )?;
    Ok(true)
}

/// What a bulk clone did with each repository.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CloneReport {
    pub cloned: Vec<String>,
    pub opted_out: Vec<String>,
    pub existing: Vec<String>,
}

/// Clone every owned repository that does not carry the opt-out `marker`.
pub fn clone_all(
    host: &dyn RepoHost,
    shell: &mut dyn Shell,
    dest_root: &Path,
    marker: &str,
) -> Result<CloneReport> {
    let mut report = CloneReport::default();
    for repo in host.repositories()? {
        if host.root_entries(&repo)?.iter().any(|name| name == marker) {
            info!("{} contains {marker}; not cloning", repo.full_name);
            report.opted_out.push(repo.name);
            continue;
        }
        if clone_repo(shell, &repo.ssh_url, dest_root)? {
            report.cloned.push(repo.name);
        } else {
            report.existing.push(repo.name);
        }
    }
    Ok(report)
}

/// Qualify `repo` with an owner when it has none.
pub fn resolve_repo(host: &dyn RepoHost, repo: &str, user: Option<&str>) -> Result<String> {
    if repo.contains('/') {
        return Ok(repo.to_string());
    }
    let owner = match user {
        Some(user) => user.to_string(),
        None => host.login()?,
    };
    Ok(format!("{owner}/{repo}"))
}

/// Assets of the latest release of `full_name`.
///
/// # Errors
/// - [`Error::AlreadyInstalled`] if a binary named like the repository is on
///   the search path and `force` is not set.
/// - [`Error::NoAssets`] if there is no release or it carries no assets.
pub fn release_assets(
    host: &dyn RepoHost,
    shell: &dyn Shell,
    full_name: &str,
    force: bool,
) -> Result<Vec<Asset>> {
    let name = full_name.rsplit('/').next().unwrap_or(full_name);
    if !force {
        if let Some(path) = shell.locate(name) {
            return Err(Error::AlreadyInstalled {
                program: name.to_string(),
                path,
            });
        }
    }

    let release = host.latest_release(full_name)?;
    let assets = match release {
        Some(release) => {
            info!("Latest release of {full_name} is {}", release.tag_name);
            release.assets
        }
        None => Vec::new(),
    };
    if assets.is_empty() {
        return Err(Error::NoAssets {
            repo: full_name.to_string(),
        });
    }
    Ok(assets)
}

/// Ask the user to pick one of `assets` by number.
///
/// Out-of-range and non-numeric answers are rejected and asked again. An
/// empty answer (or end of input) cancels.
pub fn choose_asset<R: BufRead, W: Write>(
    assets: &[Asset],
    input: &mut R,
    output: &mut W,
) -> Result<usize> {
    writeln!(output, "{}", "Choose from the following packages:".bold())?;
    for (number, asset) in assets.iter().enumerate() {
        writeln!(output, "{}: {} ({} bytes)", number + 1, asset.name, asset.size)?;
    }

    loop {
        write!(output, "Enter number of choice: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(Error::SelectionCancelled);
        }
        let choice = line.trim();
        if choice.is_empty() {
            return Err(Error::SelectionCancelled);
        }

        match choice.parse::<usize>() {
            Ok(n) if (1..=assets.len()).contains(&n) => {
                writeln!(output, "You chose to download {}", assets[n - 1].name)?;
                return Ok(n - 1);
            }
            Ok(_) => warn!("Choice '{choice}' out of range!"),
            Err(_) => warn!("Incorrect value: '{choice}'. Enter a number in range."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeShell;
    use std::collections::HashMap;
    use std::io::Cursor;

    #[derive(Default)]
    struct FakeHost {
        repos: Vec<Repository>,
        roots: HashMap<String, Vec<String>>,
        release: Option<Release>,
    }

    impl RepoHost for FakeHost {
        fn login(&self) -> Result<String> {
            Ok("octocat".to_string())
        }

        fn repositories(&self) -> Result<Vec<Repository>> {
            Ok(self.repos.clone())
        }

        fn root_entries(&self, repo: &Repository) -> Result<Vec<String>> {
            Ok(self.roots.get(&repo.name).cloned().unwrap_or_default())
        }

        fn latest_release(&self, _full_name: &str) -> Result<Option<Release>> {
            Ok(self.release.clone())
        }
    }

    fn repo(name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            full_name: format!("octocat/{name}"),
            ssh_url: format!("git@github.com:octocat/{name}.git"),
        }
    }

    fn assets(names: &[&str]) -> Vec<Asset> {
        names
            .iter()
            .map(|name| Asset {
                name: name.to_string(),
                browser_download_url: format!("https://example.com/{name}"),
                size: 1,
            })
            .collect()
    }

    #[test]
    fn token_is_read_without_trailing_newline() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".github_token");
        fs::write(&path, "ghp_secret\n").unwrap();
        assert_eq!(read_token(&path).unwrap(), "ghp_secret");
    }

    #[test]
    fn missing_or_blank_token_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".github_token");
        assert!(matches!(read_token(&path), Err(Error::TokenMissing { .. })));
        fs::write(&path, "\n").unwrap();
        assert!(matches!(read_token(&path), Err(Error::TokenMissing { .. })));
    }

    #[test]
    fn short_names_expand_to_ssh_urls() {
        assert_eq!(clone_url("dotfiles", "octocat"), "git@github.com:octocat/dotfiles.git");
        assert_eq!(
            clone_url("https://github.com/tmux/tmux.git", "octocat"),
            "https://github.com/tmux/tmux.git"
        );
        assert_eq!(repo_dir_name("git@github.com:octocat/dotfiles.git"), "dotfiles");
        assert_eq!(repo_dir_name("https://github.com/tmux/tmux"), "tmux");
    }

    #[test]
    fn bulk_clone_skips_opted_out_and_existing_repos() {
        let tmp = tempfile::tempdir().unwrap();
        make_dirs(&tmp.path().join("notes")).unwrap();

        let mut host = FakeHost {
            repos: vec![repo("dotfiles"), repo("secret"), repo("notes")],
            ..FakeHost::default()
        };
        host.roots.insert(
            "secret".to_string(),
            vec!["README.md".to_string(), ".provision_ignore".to_string()],
        );
        let mut shell = FakeShell::new().with_installed("git");

        let report = clone_all(&host, &mut shell, tmp.path(), ".provision_ignore").unwrap();
        assert_eq!(report.cloned, ["dotfiles"]);
        assert_eq!(report.opted_out, ["secret"]);
        assert_eq!(report.existing, ["notes"]);

        let dest = tmp.path().join("dotfiles");
        assert_eq!(
            shell.calls,
            [format!(
                "git clone --recursive git@github.com:octocat/dotfiles.git {}",
                dest.display()
            )]
        );
    }

    #[test]
    fn clone_requires_git() {
        let tmp = tempfile::tempdir().unwrap();
        let mut shell = FakeShell::new();
        assert!(matches!(
            clone_repo(&mut shell, "git@github.com:a/b.git", tmp.path()),
            Err(Error::ExecutableNotFound { program }) if program == "git"
        ));
    }

    #[test]
    fn bare_repo_names_get_an_owner() {
        let host = FakeHost::default();
        assert_eq!(resolve_repo(&host, "tmux/tmux", None).unwrap(), "tmux/tmux");
        assert_eq!(resolve_repo(&host, "fzf", Some("junegunn")).unwrap(), "junegunn/fzf");
        assert_eq!(resolve_repo(&host, "tools", None).unwrap(), "octocat/tools");
    }

    #[test]
    fn release_is_skipped_when_binary_exists() {
        let host = FakeHost {
            release: Some(Release {
                tag_name: "v1".into(),
                assets: assets(&["fzf.tar.gz"]),
            }),
            ..FakeHost::default()
        };
        let shell = FakeShell::new().with_installed("fzf");
        assert!(matches!(
            release_assets(&host, &shell, "junegunn/fzf", false),
            Err(Error::AlreadyInstalled { .. })
        ));
        assert_eq!(release_assets(&host, &shell, "junegunn/fzf", true).unwrap().len(), 1);
    }

    #[test]
    fn release_without_assets_is_an_error() {
        let shell = FakeShell::new();
        let empty = FakeHost {
            release: Some(Release {
                tag_name: "v1".into(),
                assets: vec![],
            }),
            ..FakeHost::default()
        };
        assert!(matches!(
            release_assets(&empty, &shell, "a/b", false),
            Err(Error::NoAssets { .. })
        ));
        assert!(matches!(
            release_assets(&FakeHost::default(), &shell, "a/b", false),
            Err(Error::NoAssets { .. })
        ));
    }

    #[test]
    fn menu_rejects_invalid_choices_until_valid() {
        let menu = assets(&["a.deb", "b.tar.gz", "c.zip"]);
        let mut input = Cursor::new("0\n4\nabc\n2\n");
        let mut output = Vec::new();

        let choice = choose_asset(&menu, &mut input, &mut output).unwrap();
        assert_eq!(choice, 1);

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1: a.deb"));
        assert!(text.contains("3: c.zip"));
        assert_eq!(text.matches("Enter number of choice: ").count(), 4);
        assert!(text.contains("You chose to download b.tar.gz"));
    }

    #[test]
    fn empty_answer_or_eof_cancels() {
        let menu = assets(&["a.deb"]);
        let mut output = Vec::new();
        assert!(matches!(
            choose_asset(&menu, &mut Cursor::new("\n"), &mut output),
            Err(Error::SelectionCancelled)
        ));
        assert!(matches!(
            choose_asset(&menu, &mut Cursor::new(""), &mut output),
            Err(Error::SelectionCancelled)
        ));
    }

    #[test]
    fn api_payloads_decode() {
        let release: Release = serde_json::from_str(
            r#"{"tag_name":"v0.9","name":"x","assets":[{"name":"a.deb","browser_download_url":"https://e/a.deb","size":3,"id":1}]}"#,
        )
        .unwrap();
        assert_eq!(release.assets[0].name, "a.deb");
        let repo: Repository = serde_json::from_str(
            r#"{"name":"n","full_name":"o/n","ssh_url":"git@github.com:o/n.git","private":false}"#,
        )
        .unwrap();
        assert_eq!(repo.full_name, "o/n");
    }
}

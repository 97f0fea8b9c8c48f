use std::io;
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use tracing::info;

use super::Context;
use crate::error::{Error, Result};
use crate::github::{self, GitHub};

#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// Repository to fetch from (name or owner/name)
    #[arg(value_parser = non_blank)]
    repo: String,

    /// Directory to save the asset in (defaults to the configured download dir)
    #[arg(long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Take the first asset instead of asking
    #[arg(long)]
    first: bool,
}

fn non_blank(value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::Argument("repository name must not be empty".to_string()));
    }
    Ok(value.to_string())
}

pub fn run(args: ReleaseArgs, ctx: &mut Context) -> Result<()> {
    let token = github::read_token(&ctx.config.token_file)?;
    let host = GitHub::new(&ctx.config.api_url, &token)?;

    let full_name = github::resolve_repo(&host, &args.repo, ctx.config.github_user.as_deref())?;
    let assets = github::release_assets(&host, &ctx.shell, &full_name, ctx.force)?;

    let index = if args.first {
        0
    } else {
        github::choose_asset(&assets, &mut io::stdin().lock(), &mut io::stdout().lock())?
    };
    let asset = &assets[index];

    let dest = args.dest.unwrap_or_else(|| ctx.config.download_dir.clone());
    info!("Downloading {} to {}", asset.name, dest.display());
    let saved = host.download(asset, &dest)?;
    println!("Saved to {}", saved.display().to_string().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_repository_names_are_rejected() {
        assert!(matches!(non_blank(""), Err(Error::Argument(_))));
        assert!(matches!(non_blank("  "), Err(Error::Argument(_))));
        assert_eq!(non_blank("tmux/tmux").unwrap(), "tmux/tmux");
    }
}

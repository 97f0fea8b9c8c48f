use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use tracing::info;

use super::Context;
use crate::error::Result;
use crate::github::{self, GitHub, RepoHost};

#[derive(Args, Debug)]
pub struct GithubArgs {
    /// Directory to clone into (defaults to the configured clone root)
    dest: Option<PathBuf>,

    /// Clone only this repository (name, owner/name or URL); repeatable
    #[arg(long = "repo", value_name = "NAME")]
    repos: Vec<String>,
}

pub fn run(args: GithubArgs, ctx: &mut Context) -> Result<()> {
    let token = github::read_token(&ctx.config.token_file)?;
    let host = GitHub::new(&ctx.config.api_url, &token)?;
    let dest = args.dest.unwrap_or_else(|| ctx.config.clone_root.clone());
    info!("Cloning into {}", dest.display());

    if !args.repos.is_empty() {
        let user = match &ctx.config.github_user {
            Some(user) => user.clone(),
            None => host.login()?,
        };
        for repo in &args.repos {
            let url = github::clone_url(repo, &user);
            if github::clone_repo(&mut ctx.shell, &url, &dest)? {
                println!("{} {}", "✓".green().bold(), format!("Cloned {repo}").green());
            }
        }
        return Ok(());
    }

    let report = github::clone_all(&host, &mut ctx.shell, &dest, &ctx.config.opt_out_marker)?;
    println!(
        "{} {}",
        "✓".green().bold(),
        format!("Cloned {} repositories", report.cloned.len()).green()
    );
    if !report.existing.is_empty() {
        println!("Already present: {}", report.existing.join(", "));
    }
    if !report.opted_out.is_empty() {
        println!("Opted out: {}", report.opted_out.join(", ").dimmed());
    }
    Ok(())
}

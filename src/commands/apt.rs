use clap::{Args, Subcommand};
use colored::Colorize;
use tracing::info;

use super::Context;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct AptArgs {
    #[command(subcommand)]
    action: AptAction,
}

#[derive(Subcommand, Debug)]
enum AptAction {
    /// Update apt cache and optionally install packages
    ///
    /// Without package names, packages are read from the configured package
    /// list (one per line).
    Install {
        /// Optional apt packages to install
        packages: Vec<String>,
    },

    /// Update all packages and clean old files
    Update {
        /// Optional apt packages to install
        packages: Vec<String>,
    },

    /// List upgradable packages, apply a full upgrade and install packages
    Upgrade {
        /// Optional apt packages to install after upgrading
        packages: Vec<String>,
    },
}

pub fn run(args: AptArgs, ctx: &mut Context) -> Result<()> {
    match args.action {
        AptAction::Install { packages } => {
            let installed = ctx.apt.install(&mut ctx.shell, &packages)?;
            info!("Installed: {}", installed.join(", "));
        }
        AptAction::Update { packages } => ctx.apt.update(&mut ctx.shell, &packages)?,
        AptAction::Upgrade { packages } => {
            let pending = ctx.apt.upgradable(&mut ctx.shell)?;
            if pending.is_empty() {
                println!("{}", "✓ All packages are up to date".green().bold());
                if packages.is_empty() {
                    return Ok(());
                }
            } else {
                println!("The following {} packages will be upgraded:\n", pending.len());
                for name in &pending {
                    println!("\t{name}");
                }
                println!();
            }
            ctx.apt.upgrade(&mut ctx.shell, &packages)?;
        }
    }
    Ok(())
}

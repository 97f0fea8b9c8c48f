use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use tracing::{error, info, warn};

mod apt;
mod commands;
mod config;
mod error;
mod fsutil;
mod github;
mod logging;
mod process;
mod sources;
mod usage;
mod workdir;

#[cfg(test)]
mod testing;

use commands::{Context, apt as apt_cmd, github as github_cmd, install, release};
use config::Config;
use usage::Tone;

const PROG: &str = "provision";

#[derive(Parser)]
#[command(name = PROG, version)]
#[command(about = "Provision a Debian machine: apt maintenance, source builds and GitHub fetches", long_about = None)]
struct Cli {
    /// Increase log output (-d for info, -dd for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    debug: u8,

    /// Install even if the program is already present
    #[arg(short, long, global = true)]
    force: bool,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage apt packages
    Apt(apt_cmd::AptArgs),

    /// Build and install programs from source
    Install(install::InstallArgs),

    /// Clone your GitHub repositories
    Github(github_cmd::GithubArgs),

    /// Download an asset from a repository's latest release
    GithubRelease(release::ReleaseArgs),

    /// Reserved for a full provisioning run
    #[command(hide = true)]
    All,
}

fn main() -> ExitCode {
    if std::env::args_os().len() <= 1 {
        let help = Cli::command().render_help().to_string();
        print!("{}", usage::paint(Tone::Help, &help));
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return ExitCode::from(usage::report(&e, PROG)),
    };

    logging::init(cli.debug);
    info!("Arguments: {:?}", std::env::args_os().skip(1).collect::<Vec<_>>());

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    let mut ctx = Context::new(config, cli.force);

    let outcome = match cli.command {
        Commands::Apt(args) => apt_cmd::run(args, &mut ctx),
        Commands::Install(args) => install::run(args, &mut ctx),
        Commands::Github(args) => github_cmd::run(args, &mut ctx),
        Commands::GithubRelease(args) => release::run(args, &mut ctx),
        Commands::All => {
            error!("No function is associated with command input");
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_skip() => {
            warn!("{e}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

use clap::Args;
use clap::builder::PossibleValuesParser;
use colored::Colorize;
use tracing::{error, info, warn};

use super::Context;
use crate::error::Result;
use crate::sources::{self, Job, Registry};

/// Build and install programs from source
///
/// Each named program is cloned, built and installed, one after the other.
/// The first failure stops the remaining programs.
#[derive(Args, Debug)]
#[command(after_help = sources::program_list())]
pub struct InstallArgs {
    /// App to build and install from source
    #[arg(
        value_name = "PROGRAM",
        required = true,
        value_parser = PossibleValuesParser::new(Registry::default().names())
    )]
    programs: Vec<String>,
}

pub fn run(args: InstallArgs, ctx: &mut Context) -> Result<()> {
    info!("Install called for: {}", args.programs.join(", "));
    let registry = Registry::default();

    for program in &args.programs {
        let mut job = Job {
            shell: &mut ctx.shell,
            apt: &mut ctx.apt,
            scratch_dir: &ctx.config.scratch_dir,
            force: ctx.force,
        };
        match registry.install(program, &mut job) {
            Ok(()) => println!("{} {}", "✓".green().bold(), format!("Installed {program}").green()),
            Err(e) if e.is_skip() => warn!("{e}"),
            Err(e) => {
                error!("Installing {program} failed");
                return Err(e);
            }
        }
    }
    Ok(())
}

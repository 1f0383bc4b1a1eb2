// hwf/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use hwf_common::error::Result;
use hwf_common::Config;

pub mod check;
pub mod sources;
pub mod status;

use crate::cli::check::Check;
use crate::cli::sources::Sources;
use crate::cli::status::Status;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "hwf", bin_name = "hwf")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Download directory (defaults to $HWF_DOWNLOAD_DIR, then ./tool)
    #[arg(long, global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check every source and download new releases
    Check(Check),
    /// Show the recorded version of each tool
    Status(Status),
    /// List the sources `check` would use
    Sources(Sources),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Check(command) => command.run(config).await,
            Self::Status(command) => command.run(config),
            Self::Sources(command) => command.run(),
        }
    }
}

/// Built-in sources, or the ones from `--sources FILE` when given.
pub(crate) fn resolve_sources(
    file: Option<&std::path::Path>,
) -> Result<Vec<hwf_core::SourceDescriptor>> {
    match file {
        Some(path) => hwf_core::load_sources(path),
        None => Ok(hwf_core::builtin_sources()),
    }
}

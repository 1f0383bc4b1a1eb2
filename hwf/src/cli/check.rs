//! Contains the logic for the `check` command.
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use hwf_common::config::Config;
use hwf_common::error::{HwfError, Result};
use hwf_core::{select_sources, RunSummary, ToolOutcome, Tracker};

use crate::cli::resolve_sources;

#[derive(Args, Debug)]
pub struct Check {
    /// Only check these tools (repeatable, case-insensitive)
    #[arg(long, value_name = "NAME")]
    pub only: Vec<String>,

    /// JSON file of source descriptors replacing the built-in list
    #[arg(long, value_name = "FILE")]
    pub sources: Option<PathBuf>,

    /// Stop at the first tool that fails instead of moving on
    #[arg(long)]
    pub fail_fast: bool,
}

impl Check {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let sources = select_sources(resolve_sources(self.sources.as_deref())?, &self.only)?;
        tracing::debug!(
            "Checking {} sources into {}",
            sources.len(),
            config.download_dir().display()
        );

        let tracker = Tracker::new(config.clone());
        let summary = tracker.run(&sources, self.fail_fast).await;
        print_summary(&summary);

        match summary.failed() {
            0 => Ok(()),
            n => Err(HwfError::Generic(format!("{n} tool(s) failed"))),
        }
    }
}

fn print_summary(summary: &RunSummary) {
    for report in &summary.reports {
        match &report.result {
            Ok(ToolOutcome::UpToDate { version }) => println!(
                "{} {} is up to date ({})",
                "==>".bold().blue(),
                report.name.bold(),
                version
            ),
            Ok(ToolOutcome::Updated {
                previous,
                version,
                path,
                bytes,
            }) => {
                let from = previous.as_deref().unwrap_or("none");
                println!(
                    "{} {} {} -> {} ({}, {} bytes)",
                    "==>".bold().green(),
                    report.name.bold(),
                    from,
                    version.green(),
                    path.display(),
                    bytes
                );
            }
            Err(e) => println!(
                "{} {} failed: {}",
                "==>".bold().red(),
                report.name.bold(),
                e
            ),
        }
    }
    if summary.aborted {
        println!(
            "{}",
            "Stopped early because --fail-fast was set.".yellow()
        );
    }
    println!(
        "{} updated, {} up to date, {} failed",
        summary.updated(),
        summary.up_to_date(),
        summary.failed()
    );
}

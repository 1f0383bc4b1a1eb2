// hwf-core/src/tracker.rs
//! Per-tool pipeline: decide, archive the superseded artifact, download, record.

use std::path::PathBuf;

use hwf_common::config::Config;
use hwf_common::error::{HwfError, Result};
use hwf_common::model::Release;
use hwf_net::http::{fetch_text, fetch_to_file, HttpOptions};
use tracing::{debug, error, info, warn};

use crate::archive::{archive_and_prune, ArchiveOutcome};
use crate::ledger::{Decision, VersionLedger};
use crate::source::SourceDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    UpToDate {
        version: String,
    },
    Updated {
        previous: Option<String>,
        version: String,
        path: PathBuf,
        bytes: u64,
    },
}

#[derive(Debug, Clone)]
pub struct ToolReport {
    pub name: String,
    pub result: Result<ToolOutcome>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<ToolReport>,
    /// Set when fail-fast stopped the run before every source was checked.
    pub aborted: bool,
}

impl RunSummary {
    pub fn updated(&self) -> usize {
        self.count(|r| matches!(r, Ok(ToolOutcome::Updated { .. })))
    }

    pub fn up_to_date(&self) -> usize {
        self.count(|r| matches!(r, Ok(ToolOutcome::UpToDate { .. })))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| r.is_err())
    }

    fn count(&self, pred: impl Fn(&Result<ToolOutcome>) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.result)).count()
    }
}

pub struct Tracker {
    config: Config,
    ledger: VersionLedger,
    http: HttpOptions,
}

impl Tracker {
    pub fn new(config: Config) -> Self {
        let ledger = VersionLedger::new(config.ledger_path());
        let http = HttpOptions::from_config(&config);
        Self {
            config,
            ledger,
            http,
        }
    }

    pub fn with_http_options(mut self, http: HttpOptions) -> Self {
        self.http = http;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }

    /// Moves the active artifact out of the way before a new version lands.
    pub fn prepare_for_update(&self, save_file_name: &str) -> ArchiveOutcome {
        archive_and_prune(
            self.config.download_dir(),
            &self.config.history_dir(),
            save_file_name,
            self.config.retention,
        )
    }

    /// Runs the version check and, when needed, the update for one release.
    ///
    /// `previous_save_name` names the active artifact of the recorded version when
    /// it differs from `release.save_file_name`. The ledger only changes after a
    /// successful download.
    pub async fn check_release(
        &self,
        release: &Release,
        previous_save_name: Option<&str>,
    ) -> Result<ToolOutcome> {
        let previous = match self.ledger.decide(&release.name, &release.version) {
            Decision::UpToDate => {
                info!("{} is already at {}", release.name, release.version);
                return Ok(ToolOutcome::UpToDate {
                    version: release.version.clone(),
                });
            }
            Decision::UpdateNeeded { previous } => previous,
        };

        match &previous {
            Some(old) => {
                info!("{} needs update: {} -> {}", release.name, old, release.version);
                let archive_name = previous_save_name.unwrap_or(&release.save_file_name);
                if let ArchiveOutcome::Failed(reason) = self.prepare_for_update(archive_name) {
                    warn!(
                        "Continuing {} update without archiving {}: {}",
                        release.name, archive_name, reason
                    );
                }
            }
            None => info!("No recorded version for {}, downloading", release.name),
        }

        let dest = self.config.active_artifact_path(&release.save_file_name);
        let bytes = fetch_to_file(&release.download_url, &dest, &self.http)
            .await
            .map_err(|e| {
                error!("{} download failed: {}", release.name, e);
                HwfError::DownloadError(
                    release.name.clone(),
                    release.download_url.clone(),
                    e.to_string(),
                )
            })?;

        self.ledger
            .record_version(&release.name, &release.version)
            .map_err(|e| {
                error!("Failed to record {} {}: {}", release.name, release.version, e);
                e
            })?;

        Ok(ToolOutcome::Updated {
            previous,
            version: release.version.clone(),
            path: dest,
            bytes,
        })
    }

    /// Scrapes the source page for its current version, then checks that release.
    pub async fn check_source(&self, source: &SourceDescriptor) -> Result<ToolOutcome> {
        info!("Checking {}", source.name);
        let page = fetch_text(&source.page_url, &self.http).await?;
        let version = source.extract_version(&page)?;
        let release = source.resolve(&version)?;
        debug!(
            "{} resolved to {} ({})",
            release.name, release.download_url, release.save_file_name
        );

        let previous_save_name = self
            .ledger
            .stored_version(&source.name)
            .and_then(|old| source.resolve(&old).ok())
            .map(|old| old.save_file_name)
            .filter(|old_name| *old_name != release.save_file_name);

        self.check_release(&release, previous_save_name.as_deref())
            .await
    }

    /// Checks every source in order. A failing tool is reported and skipped unless
    /// `fail_fast` is set, in which case the run stops at the first failure.
    pub async fn run(&self, sources: &[SourceDescriptor], fail_fast: bool) -> RunSummary {
        let mut summary = RunSummary::default();
        for source in sources {
            let result = self.check_source(source).await;
            let failed = result.is_err();
            if let Err(e) = &result {
                error!("{} failed: {}", source.name, e);
            }
            summary.reports.push(ToolReport {
                name: source.name.clone(),
                result,
            });
            if failed && fail_fast {
                summary.aborted = summary.reports.len() < sources.len();
                break;
            }
        }
        summary
    }
}

/// Narrows `sources` to the names in `only` (case-insensitive), keeping order.
pub fn select_sources(
    sources: Vec<SourceDescriptor>,
    only: &[String],
) -> Result<Vec<SourceDescriptor>> {
    if only.is_empty() {
        return Ok(sources);
    }
    if let Some(unknown) = only
        .iter()
        .find(|wanted| !sources.iter().any(|s| s.name.eq_ignore_ascii_case(wanted)))
    {
        return Err(HwfError::Config(format!("Unknown tool '{unknown}'")));
    }
    Ok(sources
        .into_iter()
        .filter(|s| only.iter().any(|wanted| s.name.eq_ignore_ascii_case(wanted)))
        .collect())
}

// hwf-core/src/archive.rs
//! Moves superseded artifacts into the history directory and caps how many
//! copies of each artifact name are kept there.
//!
//! Archived copies are named `<save name>` or, when that is taken,
//! `<save name>.<YYYYMMDDHHMMSS>` (plus `-N` on a same-second clash). Every
//! variant starts with the save name, so retention finds them by prefix.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use glob::Pattern;
use tracing::{debug, error, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// No active artifact under that name.
    NothingToArchive,
    Archived {
        destination: PathBuf,
        pruned: Vec<PathBuf>,
    },
    /// Logged and swallowed; the caller downloads regardless.
    Failed(String),
}

/// Best effort: archives `active_dir/save_file_name` into `history_dir` and prunes
/// that name's history down to `retention` copies. Never fails the caller.
pub fn archive_and_prune(
    active_dir: &Path,
    history_dir: &Path,
    save_file_name: &str,
    retention: usize,
) -> ArchiveOutcome {
    let active = active_dir.join(save_file_name);
    if !active.is_file() {
        info!("No previous artifact to archive at {}", active.display());
        return ArchiveOutcome::NothingToArchive;
    }

    if let Err(e) = fs::create_dir_all(history_dir) {
        error!(
            "Failed to create history directory {}: {}",
            history_dir.display(),
            e
        );
        return ArchiveOutcome::Failed(e.to_string());
    }

    let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let destination = archive_destination(history_dir, save_file_name, &stamp);
    info!(
        "Archiving {} -> {}",
        active.display(),
        destination.display()
    );
    if let Err(e) = fs::rename(&active, &destination) {
        error!(
            "Failed to move {} to {}: {}",
            active.display(),
            destination.display(),
            e
        );
        return ArchiveOutcome::Failed(e.to_string());
    }

    let pruned = prune_history(history_dir, save_file_name, retention);
    ArchiveOutcome::Archived {
        destination,
        pruned,
    }
}

/// First free name among `<name>`, `<name>.<stamp>`, `<name>.<stamp>-1`, ...
pub fn archive_destination(history_dir: &Path, save_file_name: &str, stamp: &str) -> PathBuf {
    let plain = history_dir.join(save_file_name);
    if !plain.exists() {
        return plain;
    }
    let stamped = history_dir.join(format!("{save_file_name}.{stamp}"));
    if !stamped.exists() {
        return stamped;
    }
    (1u32..)
        .map(|n| history_dir.join(format!("{save_file_name}.{stamp}-{n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(stamped)
}

/// Keeps the `retention` most recently modified copies of `save_file_name` in
/// `history_dir` and deletes the rest. Returns the paths actually removed.
pub fn prune_history(history_dir: &Path, save_file_name: &str, retention: usize) -> Vec<PathBuf> {
    let mut copies = archived_copies(history_dir, save_file_name);
    if copies.len() <= retention {
        debug!(
            "{} archived copies of {}, nothing to prune",
            copies.len(),
            save_file_name
        );
        return Vec::new();
    }

    copies.sort_by(|a, b| b.1.cmp(&a.1));
    let mut removed = Vec::new();
    for (path, _) in copies.into_iter().skip(retention) {
        info!("Removing old archived version: {}", path.display());
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    removed
}

/// Archived copies of `save_file_name` with their modification times.
pub fn archived_copies(history_dir: &Path, save_file_name: &str) -> Vec<(PathBuf, SystemTime)> {
    let pattern = format!(
        "{}/{}*",
        Pattern::escape(&history_dir.to_string_lossy()),
        Pattern::escape(save_file_name)
    );
    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Invalid history pattern {}: {}", pattern, e);
            return Vec::new();
        }
    };

    paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|name| is_archived_copy(&name.to_string_lossy(), save_file_name))
                .unwrap_or(false)
        })
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (path, modified)
        })
        .collect()
}

/// `<name>`, `<name>.<14 digits>` or `<name>.<14 digits>-<n>`.
fn is_archived_copy(file_name: &str, save_file_name: &str) -> bool {
    let Some(rest) = file_name.strip_prefix(save_file_name) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    let Some(rest) = rest.strip_prefix('.') else {
        return false;
    };
    if rest.len() < TIMESTAMP_LEN || !rest.is_char_boundary(TIMESTAMP_LEN) {
        return false;
    }
    let (stamp, counter) = rest.split_at(TIMESTAMP_LEN);
    if !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match counter.strip_prefix('-') {
        None => counter.is_empty(),
        Some(n) => !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()),
    }
}

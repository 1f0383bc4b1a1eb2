// hwf-core/src/ledger.rs
//! Flat `<name> = <version>` store recording the last downloaded version per tool.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hwf_common::error::{HwfError, Result};
use hwf_common::model::LedgerEntry;
use tempfile::NamedTempFile;
use tracing::{debug, error};

const SEPARATOR: &str = " = ";
const LF: &[u8] = b"\n";
const CRLF: &[u8] = b"\r\n";

/// Outcome of comparing a candidate version against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    UpToDate,
    /// `previous` is `None` when the tool has never been recorded.
    UpdateNeeded { previous: Option<String> },
}

impl Decision {
    pub fn needs_download(&self) -> bool {
        matches!(self, Decision::UpdateNeeded { .. })
    }
}

#[derive(Debug, Clone)]
pub struct VersionLedger {
    path: PathBuf,
}

impl VersionLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version stored for `name`. Missing or unreadable ledgers read as empty.
    pub fn stored_version(&self, name: &str) -> Option<String> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Ledger {} not readable: {}", self.path.display(), e);
                return None;
            }
        };
        let prefix = entry_prefix(name);
        let version = split_lines(&content)
            .find_map(|line| strip_line_ending(line).strip_prefix(prefix.as_bytes()))
            .map(|version| String::from_utf8_lossy(version).into_owned());
        version
    }

    /// Pure query: never touches artifacts.
    pub fn decide(&self, name: &str, candidate: &str) -> Decision {
        match self.stored_version(name) {
            Some(saved) if saved == candidate => {
                debug!("{} is up to date at '{}'", name, saved);
                Decision::UpToDate
            }
            Some(saved) => {
                debug!("{} needs update: '{}' -> '{}'", name, saved, candidate);
                Decision::UpdateNeeded {
                    previous: Some(saved),
                }
            }
            None => {
                debug!("No ledger entry for {}, download required", name);
                Decision::UpdateNeeded { previous: None }
            }
        }
    }

    pub fn needs_download(&self, name: &str, candidate: &str) -> bool {
        self.decide(name, candidate).needs_download()
    }

    /// Rewrites the whole ledger with `name` set to `version`.
    ///
    /// The first matching line is replaced in place and later duplicates dropped;
    /// every other line is written back byte for byte, including its line ending
    /// and any bytes that are not UTF-8. New names are appended.
    pub fn record_version(&self, name: &str, version: &str) -> Result<()> {
        let prefix = entry_prefix(name);

        let existing = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(HwfError::Ledger(format!(
                    "Failed to read ledger {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let mut content = Vec::with_capacity(existing.len() + prefix.len() + version.len() + 2);
        let mut found = false;
        let mut newline = LF;
        for (index, line) in split_lines(&existing).enumerate() {
            let ending = line_ending(line);
            if index == 0 {
                newline = ending;
            }
            if strip_line_ending(line).starts_with(prefix.as_bytes()) {
                if !found {
                    content.extend_from_slice(prefix.as_bytes());
                    content.extend_from_slice(version.as_bytes());
                    content.extend_from_slice(ending);
                    found = true;
                }
            } else {
                content.extend_from_slice(line);
                content.extend_from_slice(LF);
            }
        }
        if !found {
            content.extend_from_slice(prefix.as_bytes());
            content.extend_from_slice(version.as_bytes());
            content.extend_from_slice(newline);
        }

        self.write_atomic(&content)?;
        debug!("Recorded {} = {} in {}", name, version, self.path.display());
        Ok(())
    }

    /// All well-formed entries in stored order.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HwfError::from(e)),
        };
        Ok(split_lines(&content)
            .filter_map(|line| {
                let line = String::from_utf8_lossy(strip_line_ending(line));
                let (name, version) = line.split_once(SEPARATOR)?;
                (!name.is_empty()).then(|| LedgerEntry {
                    name: name.to_string(),
                    version: version.to_string(),
                })
            })
            .collect())
    }

    fn write_atomic(&self, content: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
            HwfError::Ledger(format!(
                "Failed to create temp file in {}: {}",
                dir.display(),
                e
            ))
        })?;
        temp_file.write_all(content)?;
        temp_file.flush()?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(&self.path).map_err(|e| {
            error!(
                "Failed to replace ledger {}: {}",
                self.path.display(),
                e.error
            );
            HwfError::Io(Arc::new(e.error))
        })?;
        Ok(())
    }
}

fn entry_prefix(name: &str) -> String {
    format!("{name}{SEPARATOR}")
}

/// Lines without their `\n`. A trailing newline does not produce an empty last line.
fn split_lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    let body = (!content.is_empty()).then(|| content.strip_suffix(LF).unwrap_or(content));
    body.into_iter().flat_map(|body| body.split(|b| *b == b'\n'))
}

/// Drops a trailing `\r` so hand-edited CRLF lines still match. Everything after
/// `"<name> = "` is the version, so composite versions such as
/// `4.6.6 Beta 5 Build 16555` keep their internal spaces.
fn strip_line_ending(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn line_ending(line: &[u8]) -> &'static [u8] {
    if line.ends_with(b"\r") {
        CRLF
    } else {
        LF
    }
}

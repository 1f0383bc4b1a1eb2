// hwf-core/src/source.rs
//! Vendor pages to watch, how to pull a version out of them and how to turn
//! that version into a download.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use hwf_common::error::{HwfError, Result};
use hwf_common::model::Release;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

const VERSION_PLACEHOLDER: &str = "{version}";
const COMPACT_PLACEHOLDER: &str = "{version_compact}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub page_url: String,
    /// Regex whose first capture group is the version.
    pub version_pattern: String,
    /// Template; `{version}` and `{version_compact}` are expanded.
    pub download_url: String,
    /// Template for the active artifact name. Defaults to the last URL segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_name: Option<String>,
}

impl SourceDescriptor {
    pub fn new(
        name: &str,
        page_url: &str,
        version_pattern: &str,
        download_url: &str,
        save_name: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_string(),
            page_url: page_url.to_string(),
            version_pattern: version_pattern.to_string(),
            download_url: download_url.to_string(),
            save_name: save_name.map(str::to_string),
        }
    }

    pub fn extract_version(&self, page: &str) -> Result<String> {
        let re = self.compiled_pattern()?;
        let version = re
            .captures(page)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| HwfError::VersionNotFound(self.name.clone(), self.page_url.clone()))?;
        debug!("Found {} version: {}", self.name, version);
        Ok(version)
    }

    pub fn resolve(&self, version: &str) -> Result<Release> {
        let download_url = expand(&self.download_url, version);
        let save_file_name = match &self.save_name {
            Some(template) => expand(template, version),
            None => url_file_name(&download_url).to_string(),
        };
        validate_save_name(&self.name, &save_file_name)?;
        Ok(Release::new(&self.name, version, download_url, save_file_name))
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.name.contains(['\n', '\r', '=']) {
            return Err(HwfError::ValidationError(format!(
                "Invalid tool name '{}'",
                self.name
            )));
        }
        let re = self.compiled_pattern()?;
        if re.captures_len() < 2 {
            return Err(HwfError::ParseError(
                "version_pattern",
                format!("pattern for '{}' needs a capture group", self.name),
            ));
        }
        Ok(())
    }

    fn compiled_pattern(&self) -> Result<Regex> {
        Regex::new(&self.version_pattern)
            .map_err(|e| HwfError::ParseError("version_pattern", format!("{}: {e}", self.name)))
    }
}

/// Version with dots and spaces removed, as vendors use it in file names
/// (`24.09` -> `2409`, `4.6.6 Beta 5 Build 16555` -> `466Beta5Build16555`).
pub fn compact_version(version: &str) -> String {
    version.chars().filter(|c| *c != '.' && *c != ' ').collect()
}

fn expand(template: &str, version: &str) -> String {
    template
        .replace(COMPACT_PLACEHOLDER, &compact_version(version))
        .replace(VERSION_PLACEHOLDER, version)
}

fn url_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

fn validate_save_name(tool: &str, save_name: &str) -> Result<()> {
    let bad = save_name.is_empty()
        || save_name == "."
        || save_name == ".."
        || save_name.contains(['/', '\\'])
        || save_name == "version.txt";
    if bad {
        return Err(HwfError::ValidationError(format!(
            "Invalid save name '{save_name}' for '{tool}'"
        )));
    }
    Ok(())
}

/// The hardware utilities tracked out of the box.
pub fn builtin_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(
            "MSIAfterburner",
            "https://www.guru3d.com/download/msi-afterburner-beta-download/",
            r"MSI Afterburner ([\d\.]+ Beta \d+ Build \d+)",
            "https://ftp.nluug.nl/pub/games/PC/guru3d/afterburner/[Guru3D]-MSIAfterburnerSetup{version_compact}.zip",
            Some("MSIAfterburnerSetup.zip"),
        ),
        SourceDescriptor::new(
            "CPU-Z",
            "https://www.cpuid.com/softwares/cpu-z.html",
            r"Version (\d+\.\d+)",
            "https://download.cpuid.com/cpu-z/cpu-z_{version}-cn.exe",
            Some("cpu-z-cn.exe"),
        ),
        SourceDescriptor::new(
            "GPU-Z",
            "https://www.guru3d.com/download/gpu-z-download-techpowerup/",
            r"<title>.*?v([\d\.]+).*?</title>",
            "https://ftp.nluug.nl/pub/games/PC/guru3d/generic/GPU-Z-[Guru3D.com].zip",
            Some("GPU-Z.zip"),
        ),
        SourceDescriptor::new(
            "HWINFO",
            "https://www.hwinfo.com/download/",
            r"<sub>Version ([\d\.]+)</sub>",
            "https://www.sac.sk/download/utildiag/hwi_{version_compact}.zip",
            Some("hwinfo.zip"),
        ),
        SourceDescriptor::new(
            "7-ZIP",
            "https://7-zip.org/",
            r"Download 7-Zip (\d+\.\d+)",
            "https://7-zip.org/a/7z{version_compact}-x64.exe",
            Some("7z-x64.exe"),
        ),
        SourceDescriptor::new(
            "AIDA64Extreme",
            "https://www.aida64.com/downloads",
            r#"<td class="version">(\d+\.\d+)"#,
            "https://download2.aida64.com/aida64extreme{version_compact}.zip",
            Some("aida64extreme.zip"),
        ),
    ]
}

/// Reads a JSON array of descriptors, rejecting invalid or duplicate entries.
pub fn load_sources(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let raw = fs::read_to_string(path).map_err(|e| {
        HwfError::Config(format!(
            "Failed to read sources file {}: {}",
            path.display(),
            e
        ))
    })?;
    let sources: Vec<SourceDescriptor> = serde_json::from_str(&raw)?;
    let mut seen = HashSet::new();
    for source in &sources {
        source.validate()?;
        if !seen.insert(source.name.as_str()) {
            return Err(HwfError::Config(format!(
                "Duplicate source '{}' in {}",
                source.name,
                path.display()
            )));
        }
    }
    debug!("Loaded {} sources from {}", sources.len(), path.display());
    Ok(sources)
}

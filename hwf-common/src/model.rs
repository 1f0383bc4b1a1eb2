// hwf-common/src/model.rs
use serde::{Deserialize, Serialize};

/// One scraped release of a tool, ready for the version check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    /// Opaque; only ever compared for exact equality.
    pub version: String,
    pub download_url: String,
    pub save_file_name: String,
}

impl Release {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        download_url: impl Into<String>,
        save_file_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            download_url: download_url.into(),
            save_file_name: save_file_name.into(),
        }
    }
}

/// A `<name> = <version>` line of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub name: String,
    pub version: String,
}

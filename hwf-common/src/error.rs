use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum HwfError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("DownloadError: Failed to download '{0}' from '{1}': {2}")]
    DownloadError(String, String, String),

    #[error("Download of '{0}' failed: max retries exceeded after {1} attempts")]
    RetriesExhausted(String, u32),

    #[error("HttpError: {0}")]
    HttpError(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Parsing Error in {0}: {1}")]
    ParseError(&'static str, String),

    #[error("Could not find a version for '{0}' on {1}")]
    VersionNotFound(String, String),

    #[error("Ledger Error: {0}")]
    Ledger(String),

    #[error("IoError: {0}")]
    IoError(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<std::io::Error> for HwfError {
    fn from(err: std::io::Error) -> Self {
        HwfError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for HwfError {
    fn from(err: reqwest::Error) -> Self {
        HwfError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for HwfError {
    fn from(err: serde_json::Error) -> Self {
        HwfError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, HwfError>;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use hwf_common::config::{Config, DEFAULT_BACKOFF_BASE, DEFAULT_MAX_RETRIES};
use hwf_common::error::{HwfError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::validation::validate_url;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Exponential backoff bounded by the retry count, not by a wait ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry number `retry` (1-based): `backoff_base * 2^retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub use_system_proxy: bool,
    pub retry: RetryPolicy,
}

impl HttpOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base: config.backoff_base,
            },
            ..Self::default()
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            max_redirects: MAX_REDIRECTS,
            user_agent: BROWSER_USER_AGENT.to_string(),
            use_system_proxy: true,
            retry: RetryPolicy::default(),
        }
    }
}

pub fn build_http_client(options: &HttpOptions) -> Result<Client> {
    let mut headers = HeaderMap::new();
    let user_agent = HeaderValue::from_str(&options.user_agent).map_err(|e| {
        HwfError::Config(format!("Invalid user agent '{}': {e}", options.user_agent))
    })?;
    headers.insert(USER_AGENT, user_agent);
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

    let mut builder = Client::builder()
        .timeout(options.timeout)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(options.max_redirects));
    if !options.use_system_proxy {
        builder = builder.no_proxy();
    }
    builder
        .build()
        .map_err(|e| HwfError::HttpError(format!("Failed to build HTTP client: {e}")))
}

/// Fetches a vendor page as text in a single attempt.
pub async fn fetch_text(url: &str, options: &HttpOptions) -> Result<String> {
    validate_url(url)?;
    let client = build_http_client(options)?;
    debug!("Fetching page: {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| HwfError::HttpError(format!("HTTP request failed for {url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(HwfError::HttpError(format!(
            "HTTP error {status} for URL {url}"
        )));
    }
    response
        .text()
        .await
        .map_err(|e| HwfError::HttpError(format!("Failed to read page body from {url}: {e}")))
}

/// Downloads `url` to `dest` with bounded retries and exponential backoff.
///
/// Every attempt builds a fresh client and streams into a sibling temp file; only
/// a fully successful attempt replaces `dest`. Returns the number of bytes written.
pub async fn fetch_to_file(url: &str, dest: &Path, options: &HttpOptions) -> Result<u64> {
    validate_url(url)?;
    let attempts = options.retry.total_attempts();

    for retry in 0..attempts {
        if retry > 0 {
            let wait = options.retry.delay_for(retry);
            info!(
                "Retry {}/{} for {}, waiting {:?}",
                retry, options.retry.max_retries, url, wait
            );
            tokio::time::sleep(wait).await;
        }

        info!("Downloading {} (attempt {}/{})", url, retry + 1, attempts);
        match download_attempt(url, dest, options).await {
            Ok(bytes) => {
                info!("Downloaded {} ({} bytes)", dest.display(), bytes);
                return Ok(bytes);
            }
            Err(e) => {
                warn!(
                    "Download attempt {}/{} for {} failed: {}",
                    retry + 1,
                    attempts,
                    url,
                    e
                );
            }
        }
    }

    error!("Giving up on {} after {} attempts", url, attempts);
    Err(HwfError::RetriesExhausted(url.to_string(), attempts))
}

async fn download_attempt(url: &str, dest: &Path, options: &HttpOptions) -> Result<u64> {
    let client = build_http_client(options)?;
    let temp_path = temp_path_for(dest);
    debug!("Downloading to temporary path: {}", temp_path.display());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| HwfError::HttpError(format!("HTTP request failed for {url}: {e}")))?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);
    if status != StatusCode::OK {
        return Err(HwfError::HttpError(format!(
            "HTTP status {status} for URL {url}"
        )));
    }

    let written = match stream_to_file(response, &temp_path).await {
        Ok(written) => written,
        Err(e) => {
            discard_temp(&temp_path).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&temp_path, dest).await {
        discard_temp(&temp_path).await;
        return Err(HwfError::IoError(format!(
            "Failed to move temp file {} to {}: {}",
            temp_path.display(),
            dest.display(),
            e
        )));
    }
    Ok(written)
}

async fn stream_to_file(response: Response, path: &Path) -> Result<u64> {
    let mut file = TokioFile::create(path).await.map_err(|e| {
        HwfError::IoError(format!(
            "Failed to create temp file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut written: u64 = 0;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk
            .map_err(|e| HwfError::HttpError(format!("Failed to read response body: {e}")))?;
        file.write_all(&chunk).await.map_err(|e| {
            HwfError::IoError(format!(
                "Failed to write download stream to {}: {}",
                path.display(),
                e
            ))
        })?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn temp_path_for(dest: &Path) -> PathBuf {
    let temp_filename = format!(
        ".{}.download",
        dest.file_name().unwrap_or_default().to_string_lossy()
    );
    dest.with_file_name(temp_filename)
}

async fn discard_temp(temp_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp_path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(
                "Could not remove temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }
}

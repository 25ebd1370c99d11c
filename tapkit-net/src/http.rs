// tapkit-net/src/http.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use tapkit_common::config::Config;
use tapkit_common::error::{Result, TapkitError};
use tapkit_common::model::formula::Formula;
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, instrument};

use crate::validation::{validate_url, verify_checksum};

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "tapkit package manager (Rust)";

/// Downloads (or reuses from cache) the formula's source archive and verifies it.
///
/// A placeholder checksum fails before any network traffic. Mirrors are tried
/// after the primary URL, in declaration order.
#[instrument(skip(formula, config), fields(formula = %formula.name, version = %formula.version))]
pub async fn fetch_formula_source(formula: &Formula, config: &Config) -> Result<PathBuf> {
    let sha256_expected = formula.sha256.expected()?;
    let cache_path = config.cache_dir().join(formula.archive_file_name());

    debug!(
        "Preparing to fetch source for '{}' from URL: {}",
        formula.name, formula.url
    );
    debug!("Target cache path: {}", cache_path.display());

    let urls_to_try: Vec<&str> = std::iter::once(formula.url.as_str())
        .chain(formula.mirrors.iter().map(String::as_str))
        .collect();
    for url in &urls_to_try {
        validate_url(url)?;
    }

    let client = build_http_client(config)?;
    fetch_into_cache(&client, &urls_to_try, &cache_path, sha256_expected).await
}

/// Returns `cache_path` if it already verifies, otherwise downloads it from the
/// first URL in `urls` that serves a verifying archive.
pub(crate) async fn fetch_into_cache(
    client: &Client,
    urls: &[&str],
    cache_path: &Path,
    sha256_expected: &str,
) -> Result<PathBuf> {
    if cache_path.is_file() {
        match verify_checksum(cache_path, sha256_expected) {
            Ok(()) => {
                debug!("Using valid cached file: {}", cache_path.display());
                return Ok(cache_path.to_path_buf());
            }
            Err(e) => {
                debug!(
                    "Cached file checksum mismatch ({}): {}. Redownloading.",
                    cache_path.display(),
                    e
                );
                if let Err(remove_err) = fs::remove_file(cache_path) {
                    debug!(
                        "Failed to remove corrupted cached file {}: {}",
                        cache_path.display(),
                        remove_err
                    );
                }
            }
        }
    } else {
        debug!("File not found in cache.");
    }

    if let Some(cache_dir) = cache_path.parent() {
        fs::create_dir_all(cache_dir).map_err(|e| {
            TapkitError::io(format!("Failed to create cache directory {}", cache_dir.display()), e)
        })?;
    }

    let mut last_error: Option<TapkitError> = None;
    for current_url in urls {
        debug!("Attempting download from: {}", current_url);
        match download_and_verify(client, current_url, cache_path, sha256_expected).await {
            Ok(path) => {
                debug!("Successfully downloaded and verified: {}", path.display());
                return Ok(path);
            }
            Err(e) => {
                error!("Download attempt failed from {}: {}", current_url, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        TapkitError::DownloadError(
            file_label(cache_path),
            String::new(),
            "No download URLs to try.".to_string(),
        )
    }))
}

pub(crate) fn build_http_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    if let Some(token) = &config.github_api_token {
        let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            TapkitError::Config(format!("TAPKIT_GITHUB_API_TOKEN is not a valid header: {e}"))
        })?;
        headers.insert(AUTHORIZATION, value);
    }
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| TapkitError::http("Failed to build HTTP client", e))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Streams `url` into a `.download` sibling of `final_path`, verifies it, then
/// renames it into place. Nothing is left at `final_path` on failure.
pub(crate) async fn download_and_verify(
    client: &Client,
    url: &str,
    final_path: &Path,
    sha256_expected: &str,
) -> Result<PathBuf> {
    let temp_path = final_path.with_file_name(format!(".{}.download", file_label(final_path)));
    debug!("Downloading to temporary path: {}", temp_path.display());
    if temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            tracing::warn!(
                "Could not remove existing temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }

    let mut response = client.get(url).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        TapkitError::http(format!("HTTP request failed for {url}"), e)
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    if !status.is_success() {
        return match status {
            StatusCode::NOT_FOUND => Err(TapkitError::DownloadError(
                file_label(final_path),
                url.to_string(),
                "Resource not found (404)".to_string(),
            )),
            StatusCode::FORBIDDEN => Err(TapkitError::DownloadError(
                file_label(final_path),
                url.to_string(),
                "Access forbidden (403)".to_string(),
            )),
            _ => Err(TapkitError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        };
    }

    let mut temp_file = TokioFile::create(&temp_path).await.map_err(|e| {
        TapkitError::io(format!("Failed to create temp file {}", temp_path.display()), e)
    })?;
    let mut total_bytes = 0usize;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TapkitError::http("Failed to read response body", e))?
    {
        total_bytes += chunk.len();
        temp_file.write_all(&chunk).await.map_err(|e| {
            TapkitError::io(
                format!("Failed to write download stream to {}", temp_path.display()),
                e,
            )
        })?;
    }
    temp_file.flush().await?;
    drop(temp_file);
    debug!("Wrote {} bytes to temp file.", total_bytes);

    if let Err(e) = verify_checksum(&temp_path, sha256_expected) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, final_path).map_err(|e| {
        TapkitError::io(
            format!(
                "Failed to move temp file {} to {}",
                temp_path.display(),
                final_path.display()
            ),
            e,
        )
    })?;
    debug!(
        "Moved verified file to final location: {}",
        final_path.display()
    );
    Ok(final_path.to_path_buf())
}

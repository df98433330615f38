// scf-net/src/http.rs
use std::path::{Path, PathBuf};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use scf_common::config::Config;
use scf_common::error::{Result, ScfError};
use tokio::fs::{self, File as TokioFile};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::validation::validate_url;

const USER_AGENT_STRING: &str = "scf formula runner (Rust; +https://github.com/andrapra-work/spacecleaner)";
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Downloads `url` into `dest_dir/file_name`. Single attempt; the partially
/// written file is removed on failure.
pub async fn fetch_archive(
    name: &str,
    url: &str,
    dest_dir: &Path,
    file_name: &str,
    config: &Config,
) -> Result<FetchedArchive> {
    validate_url(url, config.allow_http)?;
    let final_path = dest_dir.join(file_name);
    let temp_path = dest_dir.join(format!(".{file_name}.download"));
    debug!(
        "Preparing to fetch '{}' from {} into {}",
        name,
        url,
        final_path.display()
    );

    fs::create_dir_all(dest_dir).await.map_err(|e| {
        ScfError::InstallError(format!(
            "Failed to create download directory {}: {}",
            dest_dir.display(),
            e
        ))
    })?;

    let client = build_http_client(config)?;
    match download_to(&client, name, url, &temp_path).await {
        Ok(size_bytes) => {
            fs::rename(&temp_path, &final_path).await.map_err(|e| {
                ScfError::InstallError(format!(
                    "Failed to move temp file {} to {}: {}",
                    temp_path.display(),
                    final_path.display(),
                    e
                ))
            })?;
            debug!(
                "Downloaded {} bytes to {}",
                size_bytes,
                final_path.display()
            );
            Ok(FetchedArchive {
                path: final_path,
                size_bytes,
            })
        }
        Err(e) => {
            error!("Download failed from {}: {}", url, e);
            if let Err(remove_err) = fs::remove_file(&temp_path).await {
                debug!(
                    "No partial download to remove at {}: {}",
                    temp_path.display(),
                    remove_err
                );
            }
            Err(e)
        }
    }
}

fn build_http_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(config.fetch_timeout)
        .connect_timeout(config.connect_timeout)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(ScfError::from)
}

fn fetch_error(name: &str, url: &str, reason: impl Into<String>) -> ScfError {
    ScfError::FetchError {
        name: name.to_string(),
        url: url.to_string(),
        reason: reason.into(),
    }
}

async fn download_to(client: &Client, name: &str, url: &str, temp_path: &Path) -> Result<u64> {
    let response = client.get(url).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        fetch_error(name, url, format!("request failed: {e}"))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    if !status.is_success() {
        let reason = match status {
            StatusCode::NOT_FOUND => "Resource not found (404)".to_string(),
            StatusCode::FORBIDDEN => "Access forbidden (403)".to_string(),
            _ => format!("HTTP error {status}"),
        };
        return Err(fetch_error(name, url, reason));
    }

    let expected_len = response.content_length();
    let written = stream_body(response, name, url, temp_path).await?;

    if let Some(expected) = expected_len {
        if written != expected {
            return Err(fetch_error(
                name,
                url,
                format!("transfer truncated: received {written} of {expected} bytes"),
            ));
        }
    }
    Ok(written)
}

async fn stream_body(
    mut response: Response,
    name: &str,
    url: &str,
    temp_path: &Path,
) -> Result<u64> {
    let mut temp_file = TokioFile::create(temp_path).await.map_err(|e| {
        ScfError::InstallError(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;

    let mut written: u64 = 0;
    loop {
        let chunk = response
            .chunk()
            .await
            .map_err(|e| fetch_error(name, url, format!("transfer interrupted: {e}")))?;
        let Some(bytes) = chunk else { break };
        temp_file.write_all(&bytes).await?;
        written += bytes.len() as u64;
    }
    temp_file.flush().await?;
    debug!("Finished writing download stream to temp file.");
    Ok(written)
}

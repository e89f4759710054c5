use crate::{Error, Result};
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};
use url::Url;

/// Extension given to every acquired document
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Make `name` safe to use as a single path component.
///
/// Keeps alphanumerics, spaces, `_` and `-`, trims, caps the result at
/// `max_len` characters and drops trailing spaces and periods.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let safe: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let capped: String = safe.trim().chars().take(max_len).collect();
    let trimmed = capped.trim_end_matches([' ', '.']);

    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<dir>/<year>-<sanitized title>.pdf`, with `Unknown` for a missing year
pub fn document_path(dir: &Path, year: Option<u32>, title: &str, max_len: usize) -> PathBuf {
    let year = year.map_or_else(|| "Unknown".to_string(), |y| y.to_string());
    dir.join(format!(
        "{year}-{}.{DOCUMENT_EXTENSION}",
        sanitize_filename(title, max_len)
    ))
}

/// Single-attempt streaming downloader.
///
/// `read_timeout` bounds the wait for headers and for each body chunk, so a
/// slow transfer that keeps making progress is never cut off.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    chunk_size: usize,
    read_timeout: Duration,
}

impl Downloader {
    pub const fn new(client: Client, chunk_size: usize, read_timeout: Duration) -> Self {
        Self {
            client,
            chunk_size,
            read_timeout,
        }
    }

    /// Download `url` to `target`; every failure is reported as `false`
    pub async fn download(&self, url: &str, target: &Path) -> bool {
        match self.try_download(url, target).await {
            Ok(bytes) => {
                info!("Downloaded {} bytes to {:?}", bytes, target);
                true
            }
            Err(e) => {
                warn!("Download of {} failed: {}", url, e);
                false
            }
        }
    }

    /// Stream the body into a sibling `.part` file, renamed into place on success
    pub async fn try_download(&self, url: &str, target: &Path) -> Result<u64> {
        let url = document_url(url)?;
        debug!("GET {}", url);
        let request = self
            .client
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, "application/pdf")
            .send();
        let response = tokio::time::timeout(self.read_timeout, request)
            .await
            .map_err(|_| self.stalled())??;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "HTTP {} from {url}",
                response.status().as_u16()
            )));
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(target);
        match self.stream_to(response, &partial).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial, target).await?;
                Ok(bytes)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, response: reqwest::Response, path: &Path) -> Result<u64> {
        let file = File::create(path).await?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        loop {
            let next = tokio::time::timeout(self.read_timeout, stream.next())
                .await
                .map_err(|_| self.stalled())?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        writer.flush().await?;
        Ok(written)
    }

    const fn stalled(&self) -> Error {
        Error::Timeout {
            timeout: self.read_timeout,
        }
    }
}

/// Only absolute http(s) URLs are fetched
fn document_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::InvalidInput {
        field: "url".to_string(),
        reason: format!("Invalid URL: {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidInput {
            field: "url".to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

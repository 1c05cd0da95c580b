//! Release archive downloader
//!
//! Single attempt, fail fast. Retrying is left to the CI job's own policy.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{ActionError, ActionResult};

/// Fetches a URL into a local directory
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest_dir`, returning the path of the written file
    async fn download(&self, url: &Url, dest_dir: &Path) -> ActionResult<PathBuf>;
}

/// reqwest-backed downloader (http, https and file URLs)
pub struct HttpDownloader {
    http_client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    /// Downloader with an overall per-request timeout
    pub fn with_timeout(timeout: Option<Duration>) -> ActionResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "notation-action/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ActionError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }

    async fn fetch(&self, url: &Url, dest: &Path) -> ActionResult<u64> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ActionError::download(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ActionError::download(url, format!("HTTP status {}", status)));
        }

        let expected_len = response.content_length();
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ActionError::io("create", dest, e))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ActionError::download(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ActionError::io("write", dest, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ActionError::io("flush", dest, e))?;

        if let Some(expected) = expected_len {
            if written != expected {
                return Err(ActionError::download(
                    url,
                    format!("partial download: received {} of {} bytes", written, expected),
                ));
            }
        }

        Ok(written)
    }

    async fn copy_local(&self, url: &Url, dest: &Path) -> ActionResult<u64> {
        let source = url
            .to_file_path()
            .map_err(|_| ActionError::download(url, "invalid file URL"))?;
        tokio::fs::copy(&source, dest)
            .await
            .map_err(|e| ActionError::download(url, e))
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &Url, dest_dir: &Path) -> ActionResult<PathBuf> {
        let dest = dest_dir.join(file_name_for(url));
        info!("Downloading from: {}", url);

        let written = match url.scheme() {
            "http" | "https" => self.fetch(url, &dest).await?,
            "file" => self.copy_local(url, &dest).await?,
            other => {
                return Err(ActionError::download(
                    url,
                    format!("unsupported URL scheme: {}", other),
                ))
            }
        };

        info!("Downloaded {} bytes", written);
        debug!("Saved download to {:?}", dest);
        Ok(dest)
    }
}

/// Last path segment of the URL, or `download`
fn file_name_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or("download")
        .to_string()
}

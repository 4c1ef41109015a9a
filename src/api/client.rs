use std::path::{Path, PathBuf};

use futures::TryStreamExt;
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::HttpConfig;
use crate::domain::{AssetKind, DownloadOutcome};
use crate::logging;
use crate::utils::filename_from_url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP side of scraping: the page itself and every asset it references.
#[derive(Clone)]
pub struct AssetClient {
    http: Client,
    config: HttpConfig,
}

impl AssetClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let http = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self { http, config })
    }

    /// Fetch the target page body. Non-success statuses are errors.
    pub async fn fetch_page(&self, url: &Url) -> Result<String> {
        let response = self
            .http
            .get(url.clone())
            .timeout(self.config.page_timeout)
            .send()
            .await?;
        let response = check_status(url, response)?;
        Ok(response.text().await?)
    }

    /// Download an image in one request, bounded by the page timeout.
    pub async fn download_image(&self, url: &Url, folder: &Path) -> DownloadOutcome {
        match self.fetch_image(url, folder).await {
            Ok((filename, path)) => {
                logging::progress(format_args!("Downloaded: {}", filename));
                DownloadOutcome::Success(path)
            }
            Err(e) => report_failure(url, e),
        }
    }

    /// Stream a PDF to disk without a timeout, writing fixed-size chunks.
    pub async fn download_document(&self, url: &Url, folder: &Path) -> DownloadOutcome {
        match self.stream_document(url, folder).await {
            Ok((filename, path)) => {
                logging::progress(format_args!("Downloaded PDF: {}", filename));
                DownloadOutcome::Success(path)
            }
            Err(e) => report_failure(url, e),
        }
    }

    async fn fetch_image(&self, url: &Url, folder: &Path) -> Result<(String, PathBuf)> {
        let response = self
            .http
            .get(url.clone())
            .timeout(self.config.page_timeout)
            .send()
            .await?;
        let response = check_status(url, response)?;
        let body = response.bytes().await?;

        let filename = filename_from_url(url, AssetKind::Image.fallback_filename());
        let path = folder.join(&filename);
        tokio::fs::write(&path, &body).await?;

        tracing::debug!(url = %url, path = %path.display(), bytes = body.len(), "image saved");
        Ok((filename, path))
    }

    async fn stream_document(&self, url: &Url, folder: &Path) -> Result<(String, PathBuf)> {
        let response = self.http.get(url.clone()).send().await?;
        let response = check_status(url, response)?;

        let filename = filename_from_url(url, AssetKind::Document.fallback_filename());
        let path = folder.join(&filename);

        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = std::pin::pin!(response.bytes_stream());
        let mut written = 0usize;
        while let Some(chunk) = stream.try_next().await? {
            for piece in chunk.chunks(self.config.chunk_size.max(1)) {
                file.write_all(piece).await?;
            }
            written += chunk.len();
        }
        file.flush().await?;

        tracing::debug!(url = %url, path = %path.display(), bytes = written, "document saved");
        Ok((filename, path))
    }
}

fn check_status(url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FetchError::Status {
            url: url.to_string(),
            status,
        })
    }
}

fn report_failure(url: &Url, error: FetchError) -> DownloadOutcome {
    logging::failure(format_args!("Failed to download {}: {}", url, error));
    tracing::warn!(url = %url, error = %error, "asset download failed");
    DownloadOutcome::Failure(error.to_string())
}

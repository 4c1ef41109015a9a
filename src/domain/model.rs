use std::path::PathBuf;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// `<img src>`
    Image,
    /// `<a href>` ending in `.pdf`
    Document,
}

impl AssetKind {
    /// Filename used when the URL path has no usable basename.
    pub fn fallback_filename(self) -> &'static str {
        match self {
            AssetKind::Image => "image.jpg",
            AssetKind::Document => "document.pdf",
        }
    }
}

/// An asset discovered on the target page, already resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub kind: AssetKind,
    pub url: Url,
}

/// Result of downloading a single asset. Failures are per asset; the caller
/// decides whether to keep going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success(PathBuf),
    Failure(String),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success(_))
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub folder: PathBuf,
    pub outcomes: Vec<(AssetRef, DownloadOutcome)>,
}

impl ScrapeReport {
    pub fn downloaded(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.downloaded()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub folder_id: String,
    pub file_ids: Vec<String>,
}

use std::path::Path;

use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

use crate::api::{AssetClient, FetchError};
use crate::domain::{AssetKind, AssetRef, DownloadOutcome, ScrapeReport};
use crate::logging;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("could not fetch page: {0}")]
    Fetch(#[from] FetchError),

    #[error("invalid selector {0}")]
    Selector(String),
}

/// Assets referenced by one page, images before documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAssets {
    /// Every `<img>` on the page, with or without a usable `src`.
    pub image_tags: usize,
    pub assets: Vec<AssetRef>,
}

fn selector(css: &'static str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{}: {:?}", css, e)))
}

/// Find image and PDF references in `html`, resolved against `base`.
pub fn extract_assets(html: &str, base: &Url) -> Result<PageAssets, ScrapeError> {
    let document = Html::parse_document(html);
    let img_selector = selector("img")?;
    let link_selector = selector("a[href]")?;

    let mut image_tags = 0;
    let mut assets = Vec::new();

    for img in document.select(&img_selector) {
        image_tags += 1;
        let Some(src) = img.value().attr("src").filter(|s| !s.is_empty()) else {
            continue;
        };
        push_resolved(&mut assets, base, src, AssetKind::Image);
    }

    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        // Exact, case-sensitive suffix on the raw attribute.
        if href.ends_with(".pdf") {
            push_resolved(&mut assets, base, href, AssetKind::Document);
        }
    }

    Ok(PageAssets { image_tags, assets })
}

fn push_resolved(assets: &mut Vec<AssetRef>, base: &Url, reference: &str, kind: AssetKind) {
    match base.join(reference) {
        Ok(url) => assets.push(AssetRef { kind, url }),
        Err(e) => tracing::warn!(reference, error = %e, "skipping unresolvable asset reference"),
    }
}

/// Fetches the target page and downloads every asset it references.
pub struct PageScraper {
    client: AssetClient,
}

impl PageScraper {
    pub fn new(client: AssetClient) -> Self {
        Self { client }
    }

    /// Download the page's images and PDFs into `folder`.
    ///
    /// Only a failed page fetch is an error. Each asset succeeds or fails on
    /// its own and is recorded in the report.
    pub async fn scrape(&self, page_url: &Url, folder: &Path) -> Result<ScrapeReport, ScrapeError> {
        let body = self.client.fetch_page(page_url).await?;
        let page = extract_assets(&body, page_url)?;

        logging::progress(format_args!(
            "Found {} images. Starting download...",
            page.image_tags
        ));

        let mut outcomes = Vec::with_capacity(page.assets.len());
        for asset in page.assets {
            let outcome = self.download(&asset, folder).await;
            outcomes.push((asset, outcome));
        }

        let report = ScrapeReport {
            folder: folder.to_path_buf(),
            outcomes,
        };
        tracing::info!(
            url = %page_url,
            downloaded = report.downloaded(),
            failed = report.failed(),
            "scrape finished"
        );
        Ok(report)
    }

    async fn download(&self, asset: &AssetRef, folder: &Path) -> DownloadOutcome {
        match asset.kind {
            AssetKind::Image => self.client.download_image(&asset.url, folder).await,
            AssetKind::Document => self.client.download_document(&asset.url, folder).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;

    const PAGE: &str = r#"<html><body>
        <img src="/a.jpg">
        <a href="docs/report.pdf">Annual report</a>
    </body></html>"#;

    fn scraper() -> PageScraper {
        PageScraper::new(AssetClient::new(HttpConfig::default()).unwrap())
    }

    #[test]
    fn test_extract_resolves_against_page_url() {
        let base = Url::parse("https://example.com/page").unwrap();
        let page = extract_assets(PAGE, &base).unwrap();

        assert_eq!(page.image_tags, 1);
        assert_eq!(
            page.assets,
            vec![
                AssetRef {
                    kind: AssetKind::Image,
                    url: Url::parse("https://example.com/a.jpg").unwrap(),
                },
                AssetRef {
                    kind: AssetKind::Document,
                    url: Url::parse("https://example.com/docs/report.pdf").unwrap(),
                },
            ]
        );
    }

    #[test]
    fn test_extract_filters() {
        let html = r#"
            <img>
            <img src="">
            <img src="https://cdn.example.net/logo.png">
            <a href="brochure.PDF">upper case</a>
            <a href="file.pdf?download=1">query</a>
            <a href="/about">about</a>
            <a>no href</a>
            <a href="https://other.example.org/x.pdf">absolute</a>
        "#;
        let base = Url::parse("https://example.com/dir/").unwrap();
        let page = extract_assets(html, &base).unwrap();

        assert_eq!(page.image_tags, 3);
        let urls: Vec<_> = page.assets.iter().map(|a| (a.kind, a.url.as_str())).collect();
        assert_eq!(
            urls,
            vec![
                (AssetKind::Image, "https://cdn.example.net/logo.png"),
                (AssetKind::Document, "https://other.example.org/x.pdf"),
            ]
        );
    }

    #[tokio::test]
    async fn test_scrape_downloads_images_and_documents() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(PAGE)
            .create_async()
            .await;
        let img = server
            .mock("GET", "/a.jpg")
            .with_status(200)
            .with_body("jpeg-bytes")
            .create_async()
            .await;
        let pdf = server
            .mock("GET", "/docs/report.pdf")
            .with_status(200)
            .with_body("%PDF-1.7")
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();

        let url = Url::parse(&format!("{}/page", server.url())).unwrap();
        let report = scraper().scrape(&url, dir.path()).await.unwrap();

        img.assert_async().await;
        pdf.assert_async().await;
        assert_eq!(report.folder, dir.path());
        assert_eq!(report.downloaded(), 2);
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"jpeg-bytes");
        assert_eq!(std::fs::read(dir.path().join("report.pdf")).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_missing_image_does_not_stop_scrape() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/page")
            .with_status(200)
            .with_body(r#"<img src="/gone.jpg"><img src="/b.png">"#)
            .create_async()
            .await;
        server.mock("GET", "/gone.jpg").with_status(404).create_async().await;
        server
            .mock("GET", "/b.png")
            .with_status(200)
            .with_body("png")
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();

        let url = Url::parse(&format!("{}/page", server.url())).unwrap();
        let report = scraper().scrape(&url, dir.path()).await.unwrap();

        assert_eq!(report.downloaded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.outcomes[0].1.is_success());
        assert!(dir.path().join("b.png").exists());
        assert!(!dir.path().join("gone.jpg").exists());
    }

    #[tokio::test]
    async fn test_failing_document_does_not_stop_scrape() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/page")
            .with_status(200)
            .with_body(r#"<a href="/broken.pdf">x</a><a href="/ok.pdf">y</a>"#)
            .create_async()
            .await;
        server.mock("GET", "/broken.pdf").with_status(500).create_async().await;
        server
            .mock("GET", "/ok.pdf")
            .with_status(200)
            .with_body("%PDF")
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();

        let url = Url::parse(&format!("{}/page", server.url())).unwrap();
        let report = scraper().scrape(&url, dir.path()).await.unwrap();

        assert_eq!(report.failed(), 1);
        assert!(dir.path().join("ok.pdf").exists());
    }

    #[tokio::test]
    async fn test_page_server_error_fails_scrape() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/page").with_status(500).create_async().await;
        let dir = tempfile::tempdir().unwrap();

        let url = Url::parse(&format!("{}/page", server.url())).unwrap();
        let err = scraper().scrape(&url, dir.path()).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Fetch(FetchError::Status { .. })));
    }
}

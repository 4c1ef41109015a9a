mod api;
mod application;
mod auth;
mod config;
mod domain;
mod logging;
mod utils;

use std::io::{self, Write};

use anyhow::Context;
use url::Url;

use crate::api::AssetClient;
use crate::application::{FolderUploader, PageScraper};
use crate::auth::{Authenticator, ConsentFlow, LocalServerFlow};
use crate::config::AppConfig;
use crate::domain::{AppError, UploadSummary};

const PROMPT: &str = "Enter the business website URL (with https://): ";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let config = AppConfig::from_env().context("could not load configuration")?;
    let input = prompt(PROMPT).context("could not read the website URL")?;
    let flow = LocalServerFlow::new(config.auth.consent_timeout)?;

    if let Some(summary) = run(&config, &input, &flow).await? {
        tracing::debug!(
            folder_id = %summary.folder_id,
            files = summary.file_ids.len(),
            "run complete"
        );
    }

    Ok(())
}

fn prompt(message: &str) -> io::Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn parse_target(input: &str) -> Result<Url, AppError> {
    let url = Url::parse(input).map_err(|e| AppError::InvalidInput(format!("{}: {}", input, e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(AppError::InvalidInput(format!(
            "{}: expected an http(s) URL with a host",
            input
        ))),
    }
}

/// Scrape `input` into a fresh local folder, then mirror that folder to Drive.
///
/// Returns `None` when the page itself could not be scraped; nothing is
/// uploaded in that case.
async fn run(
    config: &AppConfig,
    input: &str,
    flow: &impl ConsentFlow,
) -> Result<Option<UploadSummary>, AppError> {
    let target = parse_target(input)?;
    let local_folder = utils::create_output_directory(&config.output_root, &target)?;
    tracing::debug!(path = %local_folder.display(), "output directory created");

    let scraper = PageScraper::new(AssetClient::new(config.http.clone())?);
    let report = match scraper.scrape(&target, &local_folder).await {
        Ok(report) => report,
        Err(e) => {
            logging::failure(format_args!("Error scraping assets: {}", e));
            return Ok(None);
        }
    };

    let authenticator = Authenticator::new(config.auth.clone(), config.drive.clone());
    let drive = authenticator.authenticate(flow).await?;

    let summary = FolderUploader::new(drive).upload(&report.folder).await?;
    Ok(Some(summary))
}

use std::path::Path;

use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;

use super::models::{ApiErrorResponse, DriveFile, FileMetadata};
use crate::config::{DriveConfig, USER_AGENT};

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Drive API returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Resumable upload session has no Location header")]
    MissingSessionUri,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DriveError>;

/// Drive v3 client bound to one access token.
#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    access_token: String,
    config: DriveConfig,
}

impl DriveClient {
    pub fn new(access_token: String, config: DriveConfig) -> Result<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            access_token,
            config,
        })
    }

    /// Create a folder at the root of the user's Drive and return its id.
    pub async fn create_folder(&self, name: &str) -> Result<String> {
        let url = format!("{}/drive/v3/files", self.config.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id")])
            .json(&FileMetadata::folder(name))
            .send()
            .await?;

        let file: DriveFile = check_status(response).await?.json().await?;
        tracing::debug!(folder_id = %file.id, name, "created drive folder");
        Ok(file.id)
    }

    /// Upload one local file under `parent_id` through a resumable session.
    ///
    /// The session is opened and filled in a single PUT; an interrupted
    /// transfer is not resumed.
    pub async fn upload_file(&self, path: &Path, parent_id: &str) -> Result<String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let body = tokio::fs::read(path).await?;

        let session_uri = self
            .start_resumable_session(FileMetadata::child_of(&name, parent_id), &mime, body.len())
            .await?;

        let response = self
            .http
            .put(&session_uri)
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, &mime)
            .body(body)
            .send()
            .await?;

        let file: DriveFile = check_status(response).await?.json().await?;
        tracing::debug!(file_id = %file.id, parent_id, name = %name, "uploaded file");
        Ok(file.id)
    }

    async fn start_resumable_session(
        &self,
        metadata: FileMetadata,
        mime: &str,
        length: usize,
    ) -> Result<String> {
        let url = format!("{}/upload/drive/v3/files", self.config.upload_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "resumable"), ("fields", "id")])
            .header("X-Upload-Content-Type", mime)
            .header("X-Upload-Content-Length", length.to_string())
            .json(&metadata)
            .send()
            .await?;

        let response = check_status(response).await?;
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(DriveError::MissingSessionUri)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(DriveError::Api { status, message })
}

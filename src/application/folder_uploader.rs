use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::api::{DriveClient, DriveError};
use crate::domain::UploadSummary;
use crate::logging;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{} has no folder name", .0.display())]
    UnnamedFolder(PathBuf),

    #[error("could not list {}: {source}", .path.display())]
    ListFolder {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("creating drive folder {name}: {source}")]
    CreateFolder { name: String, source: DriveError },

    #[error("uploading {}: {source}", .path.display())]
    UploadFile { path: PathBuf, source: DriveError },
}

/// Mirrors one flat local folder into a new Drive folder.
pub struct FolderUploader {
    drive: DriveClient,
}

impl FolderUploader {
    pub fn new(drive: DriveClient) -> Self {
        Self { drive }
    }

    /// Create the remote folder, then upload every regular file under it.
    ///
    /// Stops at the first failed upload; files already sent stay in Drive.
    pub async fn upload(&self, folder: &Path) -> Result<UploadSummary, UploadError> {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::UnnamedFolder(folder.to_path_buf()))?;

        let folder_id = self
            .drive
            .create_folder(&name)
            .await
            .map_err(|source| UploadError::CreateFolder {
                name: name.clone(),
                source,
            })?;
        logging::done(format_args!("Created Drive folder: {}", name));

        let files = list_files(folder)
            .await
            .map_err(|source| UploadError::ListFolder {
                path: folder.to_path_buf(),
                source,
            })?;

        let mut file_ids = Vec::with_capacity(files.len());
        for path in files {
            let id = self
                .drive
                .upload_file(&path, &folder_id)
                .await
                .map_err(|source| UploadError::UploadFile {
                    path: path.clone(),
                    source,
                })?;
            if let Some(filename) = path.file_name() {
                logging::done(format_args!("Uploaded: {}", filename.to_string_lossy()));
            }
            file_ids.push(id);
        }

        tracing::info!(%folder_id, files = file_ids.len(), "upload finished");
        Ok(UploadSummary {
            folder_id,
            file_ids,
        })
    }
}

/// Regular files directly inside `folder`, sorted by name.
async fn list_files(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        } else {
            tracing::debug!(path = %entry.path().display(), "skipping non-file entry");
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriveConfig;
    use mockito::Matcher;
    use serde_json::json;

    fn uploader_for(server: &mockito::Server) -> FolderUploader {
        let drive = DriveClient::new(
            "test-token".to_string(),
            DriveConfig {
                api_base: server.url(),
                upload_base: server.url(),
            },
        )
        .unwrap();
        FolderUploader::new(drive)
    }

    fn local_folder() -> (tempfile::TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("example.com_20240101120000");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("a.jpg"), "jpeg").unwrap();
        std::fs::write(folder.join("report.pdf"), "%PDF").unwrap();
        (root, folder)
    }

    #[tokio::test]
    async fn test_upload_creates_one_folder_and_parents_every_file() {
        let mut server = mockito::Server::new_async().await;
        let session = format!("{}/upload-session/1", server.url());
        let create_folder = server
            .mock("POST", "/drive/v3/files")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "name": "example.com_20240101120000",
                "mimeType": "application/vnd.google-apps.folder"
            })))
            .with_status(200)
            .with_body(r#"{"id":"folder-1"}"#)
            .expect(1)
            .create_async()
            .await;
        let create_file = server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({ "parents": ["folder-1"] })))
            .with_status(200)
            .with_header("location", &session)
            .expect(2)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/upload-session/1")
            .with_status(200)
            .with_body(r#"{"id":"file-x"}"#)
            .expect(2)
            .create_async()
            .await;

        let (_root, folder) = local_folder();
        let summary = uploader_for(&server).upload(&folder).await.unwrap();

        create_folder.assert_async().await;
        create_file.assert_async().await;
        put.assert_async().await;
        assert_eq!(summary.folder_id, "folder-1");
        assert_eq!(summary.file_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_folder_failure_uploads_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/drive/v3/files")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#)
            .create_async()
            .await;
        let create_file = server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (_root, folder) = local_folder();
        let err = uploader_for(&server).upload(&folder).await.unwrap_err();

        assert!(matches!(err, UploadError::CreateFolder { .. }));
        create_file.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_upload_stops_remaining_files() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/drive/v3/files")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id":"folder-1"}"#)
            .create_async()
            .await;
        let create_file = server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let (_root, folder) = local_folder();
        let err = uploader_for(&server).upload(&folder).await.unwrap_err();

        match err {
            UploadError::UploadFile { path, .. } => assert!(path.ends_with("a.jpg")),
            other => panic!("unexpected error: {other}"),
        }
        create_file.assert_async().await;
    }
}

use thiserror::Error;

use crate::api::FetchError;
use crate::application::UploadError;
use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid website URL: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

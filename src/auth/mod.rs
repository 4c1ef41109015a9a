pub mod flow;
pub mod token;

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

use crate::api::{DriveClient, DriveError};
use crate::config::{AuthConfig, DriveConfig};

pub use flow::{ConsentFlow, LocalServerFlow};
pub use token::{ClientSecrets, StoredToken};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("cannot read client secrets at {}: {source}", .path.display())]
    MissingClientSecrets {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid client secrets: {0}")]
    InvalidClientSecrets(String),

    #[error("invalid token file: {0}")]
    InvalidToken(String),

    #[error("token file: {0}")]
    TokenFile(std::io::Error),

    #[error("authorization was not granted: {0}")]
    Consent(String),

    #[error("state parameter mismatch in oauth callback")]
    StateMismatch,

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("consent timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Client(#[from] DriveError),
}

/// Produces a Drive client, reusing the persisted token while it stays valid.
pub struct Authenticator {
    config: AuthConfig,
    drive: DriveConfig,
}

impl Authenticator {
    pub fn new(config: AuthConfig, drive: DriveConfig) -> Self {
        Self { config, drive }
    }

    pub async fn authenticate(&self, flow: &impl ConsentFlow) -> Result<DriveClient, AuthError> {
        let token = self.obtain_token(flow).await?;
        let access_token = token.token.unwrap_or_default();
        Ok(DriveClient::new(access_token, self.drive.clone())?)
    }

    /// Load the persisted token, or run consent and persist the new one.
    pub async fn obtain_token(&self, flow: &impl ConsentFlow) -> Result<StoredToken, AuthError> {
        let token_path = &self.config.token_path;

        match StoredToken::load(token_path) {
            Ok(Some(token)) if token.is_valid(&self.config.scopes, Utc::now()) => {
                tracing::debug!(path = %token_path.display(), "reusing persisted token");
                return Ok(token);
            }
            Ok(Some(_)) => {
                tracing::info!(path = %token_path.display(), "persisted token is expired or lacks scope");
            }
            Ok(None) => {}
            Err(AuthError::InvalidToken(reason)) => {
                tracing::warn!(path = %token_path.display(), %reason, "ignoring unreadable token file");
            }
            Err(e) => return Err(e),
        }

        let secrets = ClientSecrets::load(&self.config.credentials_path)?;
        let token = flow.authorize(&secrets, &self.config.scopes).await?;
        token.save(token_path)?;
        tracing::debug!(path = %token_path.display(), "token persisted");

        Ok(token)
    }
}

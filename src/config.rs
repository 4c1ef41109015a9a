use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Permission requested from Drive: only files this application creates.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

pub const USER_AGENT: &str = concat!("asset-harvester/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { var: &'static str, value: String },
}

/// Settings for page and asset requests
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Timeout for the page fetch and image downloads. Documents have none.
    pub page_timeout: Duration,
    /// Size of the slices a document body is written in.
    pub chunk_size: usize,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(10),
            chunk_size: 1024,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Settings for the OAuth consent flow and token persistence
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub scopes: Vec<String>,
    /// OAuth client secret downloaded from the cloud console.
    pub credentials_path: PathBuf,
    /// Persisted token, reused across runs while valid.
    pub token_path: PathBuf,
    /// How long to wait for the user to finish consent in the browser.
    pub consent_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            scopes: vec![DRIVE_FILE_SCOPE.to_string()],
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            consent_timeout: Duration::from_secs(300),
        }
    }
}

/// Drive API endpoints
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub api_base: String,
    pub upload_base: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com".to_string(),
            upload_base: "https://www.googleapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory the timestamped output folder is created in.
    pub output_root: PathBuf,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub drive: DriveConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            http: HttpConfig::default(),
            auth: AuthConfig::default(),
            drive: DriveConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults with `HARVESTER_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("HARVESTER_CREDENTIALS") {
            config.auth.credentials_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("HARVESTER_TOKEN") {
            config.auth.token_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("HARVESTER_OUTPUT_ROOT") {
            config.output_root = PathBuf::from(path);
        }
        if let Some(secs) = lookup_seconds(&lookup, "HARVESTER_PAGE_TIMEOUT_SECS")? {
            config.http.page_timeout = secs;
        }
        if let Some(secs) = lookup_seconds(&lookup, "HARVESTER_CONSENT_TIMEOUT_SECS")? {
            config.auth.consent_timeout = secs;
        }

        Ok(config)
    }
}

fn lookup_seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(|secs| Some(Duration::from_secs(secs)))
        .map_err(|_| ConfigError::InvalidSeconds { var, value })
}

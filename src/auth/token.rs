//! On-disk OAuth artifacts: the client secret and the persisted token.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 10;

/// OAuth client registration, as downloaded from the cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Load `credentials.json`; accepts either an `installed` or `web` client.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let data = std::fs::read_to_string(path).map_err(|source| {
            AuthError::MissingClientSecrets {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::parse(&data)
    }

    fn parse(data: &str) -> Result<Self, AuthError> {
        let file: ClientSecretsFile = serde_json::from_str(data)
            .map_err(|e| AuthError::InvalidClientSecrets(e.to_string()))?;
        file.installed.or(file.web).ok_or_else(|| {
            AuthError::InvalidClientSecrets("expected an \"installed\" or \"web\" client".into())
        })
    }
}

/// Persisted credential, stored in the authorized-user JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Read the token file. `Ok(None)` when there is no file yet.
    pub fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::TokenFile(e)),
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        std::fs::write(path, json).map_err(AuthError::TokenFile)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - Duration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Usable as-is: an access token that has not expired and covers `required`.
    pub fn is_valid(&self, required: &[String], now: DateTime<Utc>) -> bool {
        let has_token = self.token.as_deref().is_some_and(|t| !t.is_empty());
        has_token && !self.is_expired(now) && self.has_scopes(required)
    }
}

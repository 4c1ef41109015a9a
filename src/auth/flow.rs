//! Installed-app OAuth consent through a loopback redirect.
//!
//! The user opens the printed authorization URL, approves access, and the
//! provider redirects to a one-shot listener on `127.0.0.1`. The code from
//! that redirect is exchanged for a token at the client's `token_uri`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use url::Url;

use super::token::{ClientSecrets, StoredToken};
use super::AuthError;
use crate::config::USER_AGENT;

/// Interactive step that turns a client registration into a fresh token.
pub trait ConsentFlow {
    fn authorize(
        &self,
        secrets: &ClientSecrets,
        scopes: &[String],
    ) -> impl Future<Output = Result<StoredToken, AuthError>>;
}

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    pub fn new() -> Self {
        Self::from_verifier(random_urlsafe(32))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

fn random_urlsafe(len: usize) -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// The production consent flow: print the URL, wait on a loopback listener.
pub struct LocalServerFlow {
    http: Client,
    timeout: Duration,
}

impl LocalServerFlow {
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, timeout })
    }
}

impl ConsentFlow for LocalServerFlow {
    async fn authorize(
        &self,
        secrets: &ClientSecrets,
        scopes: &[String],
    ) -> Result<StoredToken, AuthError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{}/", port);

        let pkce = PkceChallenge::new();
        let state = random_urlsafe(24);
        let auth_url = build_authorization_url(secrets, scopes, &redirect_uri, &state, &pkce)?;

        println!(
            "Please visit this URL to authorize this application: {}",
            auth_url
        );
        tracing::debug!(port, "waiting for oauth callback");

        let params = wait_for_callback(listener, self.timeout).await?;
        let code = validate_callback(&params, &state)?;

        exchange_code(
            &self.http,
            secrets,
            scopes,
            &code,
            &redirect_uri,
            &pkce.verifier,
        )
        .await
    }
}

fn build_authorization_url(
    secrets: &ClientSecrets,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
    pkce: &PkceChallenge,
) -> Result<Url, AuthError> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
        ],
    )
    .map_err(|e| AuthError::InvalidClientSecrets(format!("auth_uri: {}", e)))
}

/// Serve the redirect target until one request arrives or `timeout` passes.
async fn wait_for_callback(
    listener: TcpListener,
    timeout: Duration,
) -> Result<HashMap<String, String>, AuthError> {
    use axum::{extract::Query, response::Html, routing::get, Router};

    let (params_tx, params_rx) = oneshot::channel::<HashMap<String, String>>();
    let params_tx = Arc::new(Mutex::new(Some(params_tx)));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new().route(
        "/",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let params_tx = params_tx.clone();
            async move {
                if let Some(tx) = params_tx.lock().await.take() {
                    let _ = tx.send(params);
                }
                Html(
                    "<html><body><h1>Authentication complete.</h1>\
                     <p>You may close this window.</p></body></html>",
                )
            }
        }),
    );

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let received = tokio::time::timeout(timeout, params_rx).await;
    let _ = shutdown_tx.send(());

    match received {
        Ok(Ok(params)) => Ok(params),
        Ok(Err(_)) => {
            server.abort();
            Err(AuthError::Consent("callback listener stopped".into()))
        }
        Err(_) => {
            server.abort();
            Err(AuthError::Timeout(timeout.as_secs()))
        }
    }
}

/// Check the redirect parameters and pull out the authorization code.
fn validate_callback(params: &HashMap<String, String>, state: &str) -> Result<String, AuthError> {
    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .map(String::as_str)
            .unwrap_or("");
        return Err(AuthError::Consent(format!("{} {}", error, description).trim().to_string()));
    }

    let received = params
        .get("state")
        .ok_or(AuthError::MissingParameter("state"))?;
    if received != state {
        return Err(AuthError::StateMismatch);
    }

    params
        .get("code")
        .cloned()
        .ok_or(AuthError::MissingParameter("code"))
}

async fn exchange_code(
    http: &Client,
    secrets: &ClientSecrets,
    scopes: &[String],
    code: &str,
    redirect_uri: &str,
    verifier: &str,
) -> Result<StoredToken, AuthError> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", secrets.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("code_verifier", verifier),
    ];
    if let Some(secret) = secrets.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let response = http.post(&secrets.token_uri).form(&form).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::TokenExchange(format!("{} - {}", status, body)));
    }

    let token: TokenResponse = response.json().await?;
    let granted = match token.scope {
        Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
        None => scopes.to_vec(),
    };

    tracing::info!("oauth consent completed");

    Ok(StoredToken {
        token: Some(token.access_token),
        refresh_token: token.refresh_token,
        token_uri: Some(secrets.token_uri.clone()),
        client_id: Some(secrets.client_id.clone()),
        client_secret: secrets.client_secret.clone(),
        scopes: granted,
        expiry: token
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
    })
}

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::transport::{RequestBody, Transport, TransportFailure, TransportRequest};

/// A credential is considered stale this long before its actual expiry, so a
/// caller always gets a token usable for at least the margin.
const VALIDITY_MARGIN: Duration = Duration::from_secs(60);

const DEFAULT_EXPIRES_IN: u64 = 3600;

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Full token endpoint URL.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

/// Token endpoint failures are fatal for the run; the retry policy for
/// throttled downstream calls does not apply here.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token endpoint rejected credentials: {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("token endpoint unreachable: {0}")]
    Unreachable(#[from] TransportFailure),
    #[error("malformed token response: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct Credential {
    token: String,
    expires_at: Instant,
}

impl Credential {
    fn usable(&self) -> bool {
        Instant::now() + VALIDITY_MARGIN < self.expires_at
    }
}

/// Owns the bearer credential and the single-flight refresh.
///
/// The credential only ever mutates inside the mutex; callers racing a stale
/// token all block on the same lock, and whoever wins re-checks before
/// refreshing, so one wave of contention costs one token request.
pub struct TokenManager {
    config: TokenConfig,
    transport: Arc<dyn Transport>,
    current: Mutex<Option<Credential>>,
}

impl TokenManager {
    pub fn new(config: TokenConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            current: Mutex::new(None),
        }
    }

    /// Return a token guaranteed usable for at least the validity margin.
    pub async fn ensure_valid(&self) -> Result<String, AuthError> {
        let mut slot = self.current.lock().await;
        if let Some(credential) = slot.as_ref() {
            if credential.usable() {
                return Ok(credential.token.clone());
            }
        }
        self.refresh_locked(&mut slot).await
    }

    /// Drop the cached credential so the next `ensure_valid` refreshes.
    ///
    /// Used when a downstream call comes back 401: the credential may have
    /// been revoked ahead of its advertised expiry, so the cached lifetime
    /// cannot be trusted. Concurrent 401s collapse into a single refresh via
    /// the usual lock.
    pub async fn invalidate(&self) {
        self.current.lock().await.take();
    }

    async fn refresh_locked(&self, slot: &mut Option<Credential>) -> Result<String, AuthError> {
        tracing::debug!(url = %self.config.token_url, "refreshing access token");

        let form = vec![
            ("client_id".to_owned(), self.config.client_id.clone()),
            ("scope".to_owned(), self.config.scope.clone()),
            ("client_secret".to_owned(), self.config.client_secret.clone()),
            ("grant_type".to_owned(), "client_credentials".to_owned()),
        ];
        let request = TransportRequest::post(&self.config.token_url, RequestBody::Form(form));
        let response = self.transport.execute(request).await?;

        if response.status != StatusCode::OK {
            return Err(AuthError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        let grant: TokenResponse = serde_json::from_str(&response.body)?;
        let credential = Credential {
            token: grant.access_token,
            expires_at: Instant::now() + Duration::from_secs(grant.expires_in),
        };
        let token = credential.token.clone();
        *slot = Some(credential);

        Ok(token)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.config.token_url)
            .field("client_id", &self.config.client_id)
            .finish_non_exhaustive()
    }
}

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use super::auth::{AuthError, TokenManager};
use super::transport::{
    RequestBody, Transport, TransportFailure, TransportRequest, TransportResponse,
};

pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Exponential backoff base; attempt n sleeps `1.5^(n+1)` seconds unless the
/// response named its own delay.
const BACKOFF_BASE: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Abort on the first 429/5xx instead of backing off. Useful when a
    /// competing sync is known to be causing the throttling.
    pub fail_fast: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            fail_fast: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// 429/5xx retries exhausted, or fail-fast tripped. Carries the last
    /// response body the provider sent.
    #[error("throttled ({status}) after {attempts} retries: {body}")]
    Throttled {
        status: StatusCode,
        attempts: u32,
        body: String,
    },
    #[error("transport failed after {attempts} retries: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportFailure,
    },
    /// Any other non-success status.
    #[error("request failed ({status}): {body}")]
    Http { status: StatusCode, body: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("expected a structured response body, got plain text")]
    NotJson,
}

/// Parsed response body. Some endpoints legitimately return empty or
/// non-JSON bodies, so the raw text is preserved in that case.
#[derive(Debug, Clone)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Payload::Json(value) => Ok(serde_json::from_value(value)?),
            Payload::Text(_) => Err(ApiError::NotJson),
        }
    }
}

/// States of one logical request. `Backoff` always re-enters `Token` so a
/// credential that expired during the sleep is renewed before the resend.
enum CallState {
    Token { forced: bool },
    Send { token: String },
    Backoff { delay: Duration },
}

/// The one path every authenticated call takes.
///
/// Wraps a transport with the full resilience policy: single-flight token
/// acquisition, forced refresh on 401, `Retry-After`-aware backoff on
/// throttling, and an independent retry budget for network-level failures.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenManager>,
    policy: RetryPolicy,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<TokenManager>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            tokens,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn get(&self, url: &str) -> Result<Payload, ApiError> {
        self.perform(Method::GET, url, None).await
    }

    pub async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<Payload, ApiError> {
        self.perform(Method::POST, url, Some(RequestBody::Json(body)))
            .await
    }

    pub async fn get_decoded<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.get(url).await?.decode()
    }

    /// Drive the `{Token -> Send -> Backoff}` machine until the call either
    /// yields a payload or a terminal error.
    pub async fn perform(
        &self,
        method: Method,
        url: &str,
        body: Option<RequestBody>,
    ) -> Result<Payload, ApiError> {
        // Attempt counters are scoped to this one logical request and die
        // with it. The 401 budget is separate from the throttle budget,
        // which is separate again from the transport budget.
        let mut auth_retries = 0u32;
        let mut throttle_attempts = 0u32;
        let mut transport_attempts = 0u32;

        let mut state = CallState::Token { forced: false };
        loop {
            state = match state {
                CallState::Token { forced } => {
                    if forced {
                        self.tokens.invalidate().await;
                    }
                    let token = self.tokens.ensure_valid().await?;
                    CallState::Send { token }
                }

                CallState::Send { token } => {
                    let request = TransportRequest {
                        method: method.clone(),
                        url: url.to_owned(),
                        bearer: Some(token),
                        body: body.clone(),
                    };
                    match self.transport.execute(request).await {
                        Ok(response) => {
                            let status = response.status;
                            if status == StatusCode::UNAUTHORIZED
                                && auth_retries < self.policy.max_retries
                            {
                                auth_retries += 1;
                                tracing::info!(
                                    url,
                                    "401 received, forcing credential refresh and retrying"
                                );
                                CallState::Token { forced: true }
                            } else if status == StatusCode::TOO_MANY_REQUESTS
                                || status.is_server_error()
                            {
                                if self.policy.fail_fast {
                                    return Err(ApiError::Throttled {
                                        status,
                                        attempts: throttle_attempts,
                                        body: response.body,
                                    });
                                }
                                if throttle_attempts >= self.policy.max_retries {
                                    return Err(ApiError::Throttled {
                                        status,
                                        attempts: throttle_attempts,
                                        body: response.body,
                                    });
                                }
                                let delay = response
                                    .retry_after
                                    .map(Duration::from_secs_f64)
                                    .unwrap_or_else(|| backoff_delay(throttle_attempts));
                                throttle_attempts += 1;
                                tracing::warn!(
                                    url,
                                    status = status.as_u16(),
                                    delay_secs = delay.as_secs_f64(),
                                    attempt = throttle_attempts,
                                    "throttled, sleeping before retry"
                                );
                                CallState::Backoff { delay }
                            } else if status.is_success() {
                                return parse_payload(response);
                            } else {
                                return Err(ApiError::Http {
                                    status,
                                    body: response.body,
                                });
                            }
                        }
                        Err(failure) => {
                            if transport_attempts >= self.policy.max_retries {
                                return Err(ApiError::Transport {
                                    attempts: transport_attempts,
                                    source: failure,
                                });
                            }
                            let delay = backoff_delay(transport_attempts);
                            transport_attempts += 1;
                            tracing::warn!(
                                url,
                                error = %failure,
                                delay_secs = delay.as_secs_f64(),
                                attempt = transport_attempts,
                                "transport failure, sleeping before retry"
                            );
                            CallState::Backoff { delay }
                        }
                    }
                }

                CallState::Backoff { delay } => {
                    tokio::time::sleep(delay).await;
                    CallState::Token { forced: false }
                }
            };
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs_f64(BACKOFF_BASE.powi(attempt as i32 + 1))
}

fn parse_payload(response: TransportResponse) -> Result<Payload, ApiError> {
    if response.is_json() && !response.body.is_empty() {
        Ok(Payload::Json(serde_json::from_str(&response.body)?))
    } else {
        Ok(Payload::Text(response.body))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        assert_eq!(backoff_delay(0), Duration::from_secs_f64(1.5));
        assert_eq!(backoff_delay(1), Duration::from_secs_f64(2.25));
        assert!(backoff_delay(5) > backoff_delay(4));
    }
}

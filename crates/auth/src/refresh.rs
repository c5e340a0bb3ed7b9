//! Access token refresh
//!
//! [`SingleFlight`] lets any number of concurrent callers share one in-flight
//! async operation. [`TokenRefresher`] uses it so that a burst of requests that
//! all hit an expired token cause exactly one call to the refresh endpoint, and
//! all of them observe the same outcome.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::AuthError;
use crate::store::Tokens;

/// Outcome of a refresh, cloneable so every waiter gets a copy
pub type RefreshResult = Result<String, Arc<AuthError>>;

/// Shares one in-flight future between concurrent callers
pub struct SingleFlight<T: Clone> {
    inflight: Mutex<Option<Shared<BoxFuture<'static, T>>>>,
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(None),
        }
    }

    /// Join the running operation, or start one with `start` if none is running
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let started = start().boxed().shared();
                    *slot = Some(started.clone());
                    started
                }
            }
        };

        let output = flight.clone().await;

        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map_or(false, |current| current.ptr_eq(&flight)) {
            *slot = None;
        }
        output
    }

    pub fn in_flight(&self) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<RefreshData>,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Exchanges the stored refresh token for a new access token
pub struct TokenRefresher {
    http_client: Client,
    url: String,
    tokens: Tokens,
    flight: SingleFlight<RefreshResult>,
}

impl TokenRefresher {
    /// `base_url` is the API root; the refresh endpoint is `{base_url}/refresh-token/`
    pub fn new(base_url: &str, http_client: Client, tokens: Tokens) -> Self {
        Self {
            http_client,
            url: format!("{}/refresh-token/", base_url.trim_end_matches('/')),
            tokens,
            flight: SingleFlight::new(),
        }
    }

    /// Refresh now, joining a refresh that is already running
    pub async fn refresh(&self) -> RefreshResult {
        let http_client = self.http_client.clone();
        let url = self.url.clone();
        let tokens = self.tokens.clone();
        self.flight
            .run(move || async move {
                Self::request_new_token(http_client, url, tokens)
                    .await
                    .map_err(Arc::new)
            })
            .await
    }

    /// Called after a request made with `sent_token` was rejected as unauthorized.
    ///
    /// If the store already holds a different access token, another request has
    /// refreshed in the meantime and that token is returned without a network call.
    pub async fn refresh_after_failure(&self, sent_token: Option<&str>) -> RefreshResult {
        if let Some(current) = self.tokens.access_token() {
            if sent_token != Some(current.as_str()) {
                debug!("Access token changed since the request was sent; reusing it");
                return Ok(current);
            }
        }
        self.refresh().await
    }

    pub fn is_refreshing(&self) -> bool {
        self.flight.in_flight()
    }

    async fn request_new_token(
        http_client: Client,
        url: String,
        tokens: Tokens,
    ) -> Result<String, AuthError> {
        let outcome = Self::exchange(&http_client, &url, &tokens).await;
        if let Err(ref e) = outcome {
            error!("Token refresh failed: {}", e);
            if let Err(clear_err) = tokens.clear() {
                error!("Failed to clear tokens after refresh failure: {}", clear_err);
            }
        }
        outcome
    }

    async fn exchange(http_client: &Client, url: &str, tokens: &Tokens) -> Result<String, AuthError> {
        let refresh_token = tokens.refresh_token().ok_or(AuthError::MissingSession)?;

        debug!("Requesting new access token from {}", url);
        let response = http_client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&json!({ "refresh": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AuthError::RefreshFailed(format!("{}: {}", status, error_text)));
        }

        let envelope: RefreshEnvelope = response.json().await?;
        let succeeded = envelope
            .status
            .as_deref()
            .map_or(false, |s| s.eq_ignore_ascii_case("success"));

        match envelope.data {
            Some(data) if succeeded => {
                let refresh = data.refresh.unwrap_or(refresh_token);
                tokens.set_tokens(&data.access, &refresh)?;
                info!("Access token refreshed");
                Ok(data.access)
            }
            _ => Err(AuthError::RefreshFailed(
                envelope
                    .message
                    .unwrap_or_else(|| "Token refresh failed".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_flight_shares_one_run() {
        let flight: Arc<SingleFlight<u32>> = Arc::new(SingleFlight::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = flight.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run(move || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        7
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!flight.in_flight());
    }

    #[tokio::test]
    async fn test_single_flight_runs_again_after_completion() {
        let flight: SingleFlight<u32> = SingleFlight::new();
        assert_eq!(flight.run(|| async { 1 }).await, 1);
        assert_eq!(flight.run(|| async { 2 }).await, 2);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_request() {
        let tokens = Tokens::in_memory();
        tokens.set_access_token("stale").unwrap();
        // Nothing listens on this address; reaching the network would surface a NetworkError.
        let refresher = TokenRefresher::new("http://127.0.0.1:9", Client::new(), tokens.clone());

        let err = refresher.refresh().await.unwrap_err();
        assert!(matches!(*err, AuthError::MissingSession));
        assert!(tokens.access_token().is_none());
    }

    #[tokio::test]
    async fn test_changed_token_is_reused() {
        let tokens = Tokens::in_memory();
        tokens.set_tokens("fresh", "r").unwrap();
        let refresher = TokenRefresher::new("http://127.0.0.1:9", Client::new(), tokens);

        let token = refresher.refresh_after_failure(Some("stale")).await.unwrap();
        assert_eq!(token, "fresh");
    }
}

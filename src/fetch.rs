//! HTTP layer for the event staffing API
//!
//! Every request carries the stored bearer and Firebase tokens. A request
//! that comes back 401 triggers one access token refresh (shared with any
//! other request failing at the same time) and is replayed once with the new
//! token. If the refresh fails the session is cleared and
//! [`AuthEvent::LoginRequired`] is broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use event_staffing_auth::{Role, TokenRefresher, Tokens};
use log::{debug, trace, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use url::Url;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::models::ApiResponse;

pub const FIREBASE_TOKEN_HEADER: &str = "Firebase-Token";

/// Session changes observed by the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Role),
    SignedOut,
    /// The refresh token was rejected and the stored session cleared
    LoginRequired,
}

/// Shared HTTP client for all API groups
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: Client,
    tokens: Tokens,
    refresher: Arc<TokenRefresher>,
    auto_refresh_token: bool,
    health_check_timeout: Duration,
    events: broadcast::Sender<AuthEvent>,
    session_lost: Arc<AtomicBool>,
}

impl ApiClient {
    pub fn new(
        http_client: Client,
        tokens: Tokens,
        refresher: Arc<TokenRefresher>,
        options: &ClientOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            base_url: options.base_url.trim_end_matches('/').to_string(),
            http_client,
            tokens,
            refresher,
            auto_refresh_token: options.auto_refresh_token,
            health_check_timeout: options.health_check_timeout,
            events,
            session_lost: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub(crate) fn mark_signed_in(&self, role: Role) {
        self.session_lost.store(false, Ordering::SeqCst);
        let _ = self.events.send(AuthEvent::SignedIn(role));
    }

    pub(crate) fn mark_signed_out(&self) {
        let _ = self.events.send(AuthEvent::SignedOut);
    }

    fn session_expired(&self) {
        // Requests queued on the same refresh all fail; announce it once
        if !self.session_lost.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(AuthEvent::LoginRequired);
        }
    }

    pub fn get(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::GET)
    }

    pub fn post(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::POST)
    }

    pub fn put(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::PUT)
    }

    pub fn patch(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::PATCH)
    }

    pub fn delete(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::DELETE)
    }

    /// `GET /health-check/` with the short health timeout; any failure is `false`
    pub async fn health_check(&self) -> bool {
        let url = self.url("/health-check/");
        match self
            .http_client
            .get(&url)
            .timeout(self.health_check_timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!("Health check -> {}", response.status());
                response.status().is_success()
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }
}

#[derive(Clone)]
struct FilePart {
    field: String,
    bytes: Vec<u8>,
    filename: String,
    mime: Option<String>,
}

// Kept in replayable form; a multipart form is consumed on send
enum RequestBody {
    Empty,
    Json(Vec<u8>),
    Multipart(Vec<FilePart>),
}

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    api: &'a ApiClient,
    method: Method,
    path: String,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
    body: RequestBody,
}

impl<'a> FetchBuilder<'a> {
    fn new(api: &'a ApiClient, path: &str, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            api,
            method,
            path: path.to_string(),
            headers,
            query_params: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// Add a header to the request
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_map(mut self, params: HashMap<String, String>) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = RequestBody::Json(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Add a file to a multipart body
    pub fn file(mut self, field: &str, bytes: Vec<u8>, filename: &str, mime: Option<&str>) -> Self {
        let part = FilePart {
            field: field.to_string(),
            bytes,
            filename: filename.to_string(),
            mime: mime.map(str::to_string),
        };
        match &mut self.body {
            RequestBody::Multipart(parts) => parts.push(part),
            _ => self.body = RequestBody::Multipart(vec![part]),
        }
        self
    }

    fn build(&self, access_token: Option<&str>) -> Result<RequestBuilder> {
        let mut url = Url::parse(&self.api.url(&self.path))?;
        if !self.query_params.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                query_pairs.append_pair(key, value);
            }
        }

        let mut headers = self.headers.clone();
        if let Some(token) = access_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        if let Some(firebase_token) = self.api.tokens.firebase_token() {
            if let Ok(value) = HeaderValue::from_str(&firebase_token) {
                headers.insert(FIREBASE_TOKEN_HEADER, value);
            }
        }

        let mut req = self.api.http_client.request(self.method.clone(), url.as_str());
        match &self.body {
            RequestBody::Empty => {}
            RequestBody::Json(body) => {
                trace!("{} {} body: {}", self.method, self.path, String::from_utf8_lossy(body));
                req = req.body(body.clone());
            }
            RequestBody::Multipart(parts) => {
                // reqwest sets the boundary
                headers.remove(CONTENT_TYPE);
                let mut form = Form::new();
                for part in parts {
                    let mut file = Part::bytes(part.bytes.clone()).file_name(part.filename.clone());
                    if let Some(mime) = &part.mime {
                        file = file.mime_str(mime)?;
                    }
                    form = form.part(part.field.clone(), file);
                }
                req = req.multipart(form);
            }
        }

        Ok(req.headers(headers))
    }

    async fn send_once(&self, access_token: Option<&str>) -> Result<Response> {
        let response = self.build(access_token)?.send().await?;
        debug!("{} {} -> {}", self.method, self.path, response.status());
        Ok(response)
    }

    /// Send, refreshing the token and replaying once on 401
    pub async fn execute_raw(&self) -> Result<Response> {
        let sent_token = self.api.tokens.access_token();
        let response = self.send_once(sent_token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !self.api.auto_refresh_token {
            return Ok(response);
        }

        debug!("{} {} unauthorized, refreshing access token", self.method, self.path);
        let token = match self.api.refresher.refresh_after_failure(sent_token.as_deref()).await {
            Ok(token) => {
                self.api.session_lost.store(false, Ordering::SeqCst);
                token
            }
            Err(e) => {
                warn!("Token refresh failed, login required: {}", e);
                self.api.session_expired();
                return Err(Error::LoginRequired);
            }
        };

        let replay = self.send_once(Some(&token)).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            warn!("{} {} still unauthorized after refresh", self.method, self.path);
            return Err(error_from_response(replay).await);
        }
        Ok(replay)
    }

    /// Send and fail on any non-success status
    pub async fn execute_checked(&self) -> Result<Response> {
        let response = self.execute_raw().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response)
    }

    /// Execute the request and parse the response as JSON
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let response = self.execute_checked().await?;
        let result = response.json::<T>().await?;
        Ok(result)
    }

    /// Decode the `{status, status_code, message, data}` envelope, failing on a non-success `status`
    pub async fn send_envelope<T: DeserializeOwned>(&self) -> Result<ApiResponse<T>> {
        self.execute::<ApiResponse<T>>().await?.into_result()
    }

    /// The payload, whether or not the server wrapped it in an envelope
    pub async fn send_data<T: DeserializeOwned>(&self) -> Result<T> {
        let value: serde_json::Value = self.execute().await?;
        if is_envelope(&value) {
            serde_json::from_value::<ApiResponse<T>>(value)?.into_data()
        } else {
            Ok(serde_json::from_value(value)?)
        }
    }

    /// The envelope message alongside the payload; a success envelope without data gives `T::default()`
    pub async fn send_with_message<T: DeserializeOwned + Default>(
        &self,
    ) -> Result<(Option<String>, T)> {
        let value: serde_json::Value = self.execute().await?;
        if is_envelope(&value) {
            let envelope = serde_json::from_value::<ApiResponse<T>>(value)?.into_result()?;
            Ok((envelope.message, envelope.data.unwrap_or_default()))
        } else {
            Ok((None, serde_json::from_value(value)?))
        }
    }

    /// For actions: checks the status and returns the server's message, if any
    pub async fn send_ack(&self) -> Result<Option<String>> {
        let response = self.execute_checked().await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<ApiResponse<serde_json::Value>>(&text) {
            Ok(envelope) => Ok(envelope.into_result()?.message),
            Err(_) => Ok(None),
        }
    }
}

fn is_envelope(value: &serde_json::Value) -> bool {
    value.as_object().map_or(false, |map| {
        map.contains_key("data") && (map.contains_key("status") || map.contains_key("status_code"))
    })
}

/// `message`, `error` or `detail` from a JSON error body, else the body itself unless it is markup
pub(crate) fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return ["message", "error", "detail"]
            .iter()
            .find_map(|key| value.get(key).and_then(|m| m.as_str()))
            .unwrap_or_default()
            .to_string();
    }
    let trimmed = body.trim();
    if trimmed.starts_with('<') {
        String::new()
    } else {
        trimmed.chars().take(200).collect()
    }
}

async fn error_from_response(response: Response) -> Error {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(text) => Error::api(status, extract_message(&text)),
        Err(e) => Error::Http(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message() {
        assert_eq!(extract_message(r#"{"message":"Event not found"}"#), "Event not found");
        assert_eq!(extract_message(r#"{"detail":"Given token not valid"}"#), "Given token not valid");
        assert_eq!(extract_message(r#"{"status":"Error"}"#), "");
        assert_eq!(extract_message("<html><body>502</body></html>"), "");
        assert_eq!(extract_message("Bad gateway"), "Bad gateway");
    }

    #[test]
    fn test_envelope_detection() {
        assert!(is_envelope(&serde_json::json!({ "status": "Success", "data": [] })));
        assert!(!is_envelope(&serde_json::json!({ "data": [] })));
        assert!(!is_envelope(&serde_json::json!([1, 2])));
    }

    #[test]
    fn test_url_joining() {
        let tokens = Tokens::in_memory();
        let refresher = Arc::new(TokenRefresher::new("http://api.test", Client::new(), tokens.clone()));
        let options = ClientOptions::default().with_base_url("http://api.test/webapi/");
        let api = ApiClient::new(Client::new(), tokens, refresher, &options);
        assert_eq!(api.url("/events"), "http://api.test/webapi/events");
        assert_eq!(api.url("api/employees/3"), "http://api.test/webapi/api/employees/3");
    }
}

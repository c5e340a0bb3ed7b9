use std::sync::Arc;

use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AuthError;
use crate::firebase::{FirebaseAuth, FirebaseSession};
use crate::refresh::TokenRefresher;
use crate::session::{is_token_expired, Role, UserData};
use crate::store::Tokens;

/// Client options
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub auto_refresh_token: bool,
    pub persist_user_data: bool,
    /// `requestUri` sent with Google sign-in
    pub oauth_request_uri: String,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_user_data: true,
            oauth_request_uri: "http://localhost".to_string(),
        }
    }
}

/// Sign-in provider reported to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginProvider {
    Password,
    Google,
    Custom,
}

/// Result of a completed backend login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserData,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    access: String,
    refresh: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct SuperadminLoginResponse {
    token: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Sign-in and session management against the event staffing backend
pub struct AuthClient {
    base_url: String,
    http_client: Client,
    tokens: Tokens,
    firebase: Option<FirebaseAuth>,
    refresher: Arc<TokenRefresher>,
    options: AuthOptions,
}

impl AuthClient {
    pub fn new(
        base_url: &str,
        http_client: Client,
        tokens: Tokens,
        firebase: Option<FirebaseAuth>,
        options: AuthOptions,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let refresher = Arc::new(TokenRefresher::new(
            &base_url,
            http_client.clone(),
            tokens.clone(),
        ));
        Self {
            base_url,
            http_client,
            tokens,
            firebase,
            refresher,
            options,
        }
    }

    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    pub fn refresher(&self) -> Arc<TokenRefresher> {
        self.refresher.clone()
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    pub fn firebase(&self) -> Option<&FirebaseAuth> {
        self.firebase.as_ref()
    }

    fn firebase_client(&self) -> Result<&FirebaseAuth, AuthError> {
        self.firebase.as_ref().ok_or(AuthError::NotConfigured("Firebase"))
    }

    /// Firebase email/password sign-in followed by the backend login
    pub async fn login_with_email(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let session = self.firebase_client()?.sign_in_with_password(email, password).await?;
        self.tokens.set_firebase_token(&session.id_token)?;
        self.authenticate_with_backend(&session, LoginProvider::Password).await
    }

    /// Google sign-in with an OAuth ID token obtained by the caller
    pub async fn login_with_google(&self, google_id_token: &str) -> Result<LoginOutcome, AuthError> {
        let session = self
            .firebase_client()?
            .sign_in_with_google_id_token(google_id_token, &self.options.oauth_request_uri)
            .await?;
        self.tokens.set_firebase_token(&session.id_token)?;
        self.authenticate_with_backend(&session, LoginProvider::Google).await
    }

    /// Sign in with a Firebase custom token issued by the server
    pub async fn login_with_custom_token(&self, custom_token: &str) -> Result<LoginOutcome, AuthError> {
        let session = self.firebase_client()?.sign_in_with_custom_token(custom_token).await?;
        self.tokens.set_firebase_token(&session.id_token)?;
        self.authenticate_with_backend(&session, LoginProvider::Custom).await
    }

    /// Trade a Firebase session for backend access/refresh tokens and a role
    pub async fn authenticate_with_backend(
        &self,
        session: &FirebaseSession,
        provider: LoginProvider,
    ) -> Result<LoginOutcome, AuthError> {
        let url = format!("{}/unified-login/", self.base_url);
        let email = session.email.clone().unwrap_or_default();

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Firebase-Token", &session.id_token)
            .json(&json!({
                "firebase_token": session.id_token,
                "email": email,
                "provider": provider,
                "uid": session.uid,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::ApiError(extract_message(&error_text)));
        }

        let envelope: LoginEnvelope = response.json().await?;
        let succeeded = envelope
            .status
            .as_deref()
            .map_or(false, |s| s.eq_ignore_ascii_case("success"));
        let data = match envelope.data {
            Some(data) if succeeded => data,
            _ => {
                return Err(AuthError::ApiError(
                    envelope
                        .message
                        .unwrap_or_else(|| "Invalid response from server".to_string()),
                ))
            }
        };

        self.tokens.set_tokens(&data.access, &data.refresh)?;
        let user = UserData {
            email,
            role: data.role,
            uid: session.uid.clone(),
            display_name: session.display_name.clone(),
        };
        if self.options.persist_user_data {
            self.tokens.set_user_data(&user)?;
        }
        info!("Signed in as {} ({})", user.email, user.role);

        Ok(LoginOutcome {
            user,
            access_token: data.access,
            refresh_token: data.refresh,
        })
    }

    /// Direct superadmin login without Firebase
    pub async fn superadmin_login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let url = format!("{}/superadmin-login/", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::AuthenticationError(extract_message(&error_text)));
        }

        let body: SuperadminLoginResponse = response.json().await?;
        let refresh = body.refresh.unwrap_or_default();
        self.tokens.set_tokens(&body.token, &refresh)?;
        let user = UserData::new(email, Role::Superadmin);
        if self.options.persist_user_data {
            self.tokens.set_user_data(&user)?;
        }

        Ok(LoginOutcome {
            user,
            access_token: body.token,
            refresh_token: refresh,
        })
    }

    /// Forget every stored credential
    pub fn logout(&self) -> Result<(), AuthError> {
        info!("Signing out");
        self.tokens.clear()
    }

    pub fn current_user(&self) -> Option<UserData> {
        self.tokens.user_data()
    }

    /// An access token is stored and has not expired
    pub fn is_authenticated(&self) -> bool {
        match self.tokens.access_token() {
            Some(token) => !is_token_expired(&token),
            None => false,
        }
    }

    /// Delete a Firebase account with its own ID token; failures are returned, not swallowed
    pub async fn delete_firebase_account(&self, id_token: &str) -> Result<(), AuthError> {
        let firebase = self.firebase_client()?;
        firebase.delete_account(id_token).await.map_err(|e| {
            warn!("Firebase account deletion failed: {}", e);
            e
        })
    }
}

/// Pull `message` (or `error`) out of a JSON error body, falling back to the raw text
pub(crate) fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

//! Firebase Authentication over the Identity Toolkit REST API

use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::error::AuthError;

pub const DEFAULT_FIREBASE_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Tokens and identity returned by a successful Firebase sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseSession {
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, rename = "localId")]
    pub uid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    error: FirebaseErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorDetail {
    #[serde(default)]
    message: String,
}

/// Operator-facing message for an Identity Toolkit error code
pub fn describe_error_code(code: &str) -> String {
    // Codes may carry a suffix, e.g. "TOO_MANY_ATTEMPTS_TRY_LATER : Access ..."
    let code = code.split(" : ").next().unwrap_or(code).trim();
    match code {
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_CREDENTIAL" | "INVALID_EMAIL" => {
            "Invalid email or password".to_string()
        }
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => "No account found with this email".to_string(),
        "INVALID_PASSWORD" => "Incorrect password".to_string(),
        "USER_DISABLED" => "This account has been disabled".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.".to_string(),
        "INVALID_CUSTOM_TOKEN" | "CREDENTIAL_MISMATCH" => "The sign-in token was rejected".to_string(),
        "EMAIL_EXISTS" => "An account with this email already exists.".to_string(),
        "OPERATION_NOT_ALLOWED" => {
            "Email/password accounts are not enabled. Please contact support.".to_string()
        }
        "WEAK_PASSWORD" => "The password is too weak.".to_string(),
        other => other.to_string(),
    }
}

/// Firebase Authentication client
#[derive(Debug, Clone)]
pub struct FirebaseAuth {
    base_url: String,
    api_key: String,
    http_client: Client,
}

impl FirebaseAuth {
    pub fn new(api_key: &str, http_client: Client) -> Self {
        Self::with_base_url(DEFAULT_FIREBASE_BASE_URL, api_key, http_client)
    }

    /// Point the client at a different Identity Toolkit host (emulator, tests)
    pub fn with_base_url(base_url: &str, api_key: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client,
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("{}/v1/accounts:{}", self.base_url, method))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<T, AuthError> {
        debug!("Firebase accounts:{}", method);
        let response = self
            .http_client
            .post(self.endpoint(method)?)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            let message = match serde_json::from_str::<FirebaseErrorBody>(&error_text) {
                Ok(body) => describe_error_code(&body.error.message),
                Err(_) => error_text,
            };
            warn!("Firebase accounts:{} failed: {}", method, message);
            return Err(AuthError::AuthenticationError(message));
        }

        Ok(response.json().await?)
    }

    /// Email/password sign-in
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<FirebaseSession, AuthError> {
        self.call(
            "signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    /// Create an email/password account
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<FirebaseSession, AuthError> {
        self.call(
            "signUp",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    /// Sign in with a custom token issued by the event staffing backend
    pub async fn sign_in_with_custom_token(&self, token: &str) -> Result<FirebaseSession, AuthError> {
        self.call(
            "signInWithCustomToken",
            json!({ "token": token, "returnSecureToken": true }),
        )
        .await
    }

    /// Exchange a Google OAuth ID token for a Firebase session
    pub async fn sign_in_with_google_id_token(
        &self,
        google_id_token: &str,
        request_uri: &str,
    ) -> Result<FirebaseSession, AuthError> {
        let post_body = format!("id_token={}&providerId=google.com", google_id_token);
        self.call(
            "signInWithIdp",
            json!({
                "postBody": post_body,
                "requestUri": request_uri,
                "returnIdpCredential": true,
                "returnSecureToken": true,
            }),
        )
        .await
    }

    /// Delete the Firebase account that owns `id_token`
    pub async fn delete_account(&self, id_token: &str) -> Result<(), AuthError> {
        let _: serde_json::Value = self.call("delete", json!({ "idToken": id_token })).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_operator_messages() {
        assert_eq!(describe_error_code("INVALID_LOGIN_CREDENTIALS"), "Invalid email or password");
        assert_eq!(describe_error_code("EMAIL_NOT_FOUND"), "No account found with this email");
        assert_eq!(describe_error_code("INVALID_PASSWORD"), "Incorrect password");
        assert_eq!(
            describe_error_code("TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled"),
            "Too many attempts. Please try again later."
        );
        assert_eq!(describe_error_code("SOMETHING_NEW"), "SOMETHING_NEW");
    }

    #[test]
    fn test_api_key_is_query_encoded() {
        let auth = FirebaseAuth::with_base_url("http://localhost:9099/", "k&y=1 2", Client::new());
        let url = auth.endpoint("signUp").unwrap();
        assert_eq!(url.path(), "/v1/accounts:signUp");
        assert_eq!(url.query(), Some("key=k%26y%3D1+2"));
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("key".to_string(), "k&y=1 2".to_string())]);
    }

    #[test]
    fn test_session_parses_identity_toolkit_shape() {
        let session: FirebaseSession = serde_json::from_value(json!({
            "idToken": "id",
            "refreshToken": "rt",
            "localId": "uid-1",
            "email": "a@b.com",
            "expiresIn": "3600"
        }))
        .unwrap();
        assert_eq!(session.uid.as_deref(), Some("uid-1"));
        assert_eq!(session.expires_in.as_deref(), Some("3600"));
    }
}

//! Error handling for the event staffing client

use std::collections::BTreeMap;
use std::fmt;

use event_staffing_auth::AuthError;
use event_staffing_realtime::RealtimeError;
use thiserror::Error;

/// Field name to message, as shown next to form inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0.insert(field.to_string(), message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Unified error type for the event staffing client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Realtime error: {0}")]
    Realtime(#[from] RealtimeError),

    /// Non-success response; `message` is the server's message when it sent one
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Token refresh gave up; the session is gone
    #[error("Session expired, please log in again")]
    LoginRequired,

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Invalid QR code: {0}")]
    InvalidQr(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Scan workflow event that is not allowed in the current state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("{0}")]
    General(String),
}

impl Error {
    pub fn api<T: fmt::Display>(status: u16, message: T) -> Self {
        Error::Api {
            status,
            message: message.to_string(),
        }
    }

    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::LoginRequired) || self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Text for the operator: the server's message when there is one, else `fallback`
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Error::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            Error::Auth(AuthError::AuthenticationError(message)) => message.clone(),
            Error::Auth(AuthError::ApiError(message)) if !message.trim().is_empty() => {
                message.clone()
            }
            Error::LoginRequired | Error::Validation(_) | Error::InvalidQr(_) => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

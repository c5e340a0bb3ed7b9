use thiserror::Error;

/// Errors raised by the session and sign-in layer
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Missing session")]
    MissingSession,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Token storage error: {0}")]
    StorageError(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        AuthError::StorageError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

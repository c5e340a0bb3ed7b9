//! Event staffing auth client for Rust
//!
//! This crate provides the session layer of the event staffing API: token
//! storage, backend login through Firebase Authentication, role lookup and
//! single-flight access token refresh.

mod client;
mod error;
mod firebase;
mod refresh;
mod session;
mod store;

pub use client::{AuthClient, AuthOptions, LoginOutcome, LoginProvider};
pub use error::{AuthError, Result};
pub use firebase::{describe_error_code, FirebaseAuth, FirebaseSession, DEFAULT_FIREBASE_BASE_URL};
pub use refresh::{RefreshResult, SingleFlight, TokenRefresher};
pub use session::{is_token_expired, token_expiry, Role, UserData};
pub use store::{
    FileTokenStore, MemoryTokenStore, TokenStore, Tokens, ACCESS_TOKEN_KEY, FIREBASE_TOKEN_KEY,
    REFRESH_TOKEN_KEY, USER_DATA_KEY,
};

//! Session data: roles, the persisted user record and token expiry

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AuthError;

/// Dashboard role of the signed-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Superadmin,
    Admin,
    Employee,
}

impl Role {
    /// Wire spelling used by the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Superadmin => "Superadmin",
            Self::Admin => "admin",
            Self::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "superadmin" | "super_admin" => Ok(Self::Superadmin),
            "admin" => Ok(Self::Admin),
            "employee" => Ok(Self::Employee),
            other => Err(AuthError::AuthenticationError(format!("Unknown role: {}", other))),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// User record persisted next to the tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl UserData {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            email: email.to_string(),
            role,
            uid: None,
            display_name: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: Option<i64>,
}

/// Expiry (`exp`, seconds since epoch) of a JWT, read without verifying the signature
pub fn token_expiry(token: &str) -> Result<Option<i64>, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    Ok(data.claims.exp)
}

/// `true` when the token cannot be decoded, has no `exp`, or `exp` is in the past
pub fn is_token_expired(token: &str) -> bool {
    if token.is_empty() {
        return true;
    }
    match token_expiry(token) {
        Ok(Some(exp)) => exp <= Utc::now().timestamp(),
        Ok(None) => true,
        Err(e) => {
            log::debug!("Token decoding failed: {}", e);
            true
        }
    }
}

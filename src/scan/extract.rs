use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Email:\s*([^,\s]+)").unwrap());
static UNIQUE_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Unique ID:\s*(\w+)").unwrap());

/// Who a QR code identifies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrIdentity {
    Email(String),
    UniqueId(String),
}

impl QrIdentity {
    pub fn email(&self) -> Option<&str> {
        match self {
            QrIdentity::Email(email) => Some(email),
            QrIdentity::UniqueId(_) => None,
        }
    }

    pub fn unique_id(&self) -> Option<&str> {
        match self {
            QrIdentity::UniqueId(id) => Some(id),
            QrIdentity::Email(_) => None,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            QrIdentity::Email(value) | QrIdentity::UniqueId(value) => value,
        }
    }
}

impl fmt::Display for QrIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QrIdentity::Email(email) => write!(f, "email {}", email),
            QrIdentity::UniqueId(id) => write!(f, "unique id {}", id),
        }
    }
}

/// Pull the attendee out of a badge payload such as
/// `"Name: Asha, Email: asha@example.com, Phone: ..."`. The email wins when both are present.
pub fn extract_identity(text: &str) -> Result<QrIdentity> {
    if let Some(captures) = EMAIL_PATTERN.captures(text) {
        return Ok(QrIdentity::Email(captures[1].to_string()));
    }
    if let Some(captures) = UNIQUE_ID_PATTERN.captures(text) {
        return Ok(QrIdentity::UniqueId(captures[1].to_string()));
    }
    Err(Error::InvalidQr(
        "No email or unique ID found in QR code".to_string(),
    ))
}

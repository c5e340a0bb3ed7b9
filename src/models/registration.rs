use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attendee registered through the public form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub extra_fields: BTreeMap<String, serde_json::Value>,
}

/// Body of `POST /user-registration/`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendeeRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub extra_fields: BTreeMap<String, String>,
}

/// Landing data for the admin welcome page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomeInfo {
    #[serde(alias = "eventgroup_name", alias = "event_group_name", alias = "name")]
    pub company_name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

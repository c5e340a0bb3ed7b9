use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationErrors};

static NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z\s]*$").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "available_by_default", alias = "availability")]
    pub is_available: bool,
    #[serde(default)]
    pub firebase_uid: Option<String>,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default, alias = "profile_photo")]
    pub photo: Option<String>,
}

fn available_by_default() -> bool {
    true
}

/// Position choice, shown as `label`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(alias = "id")]
    pub value: String,
    #[serde(alias = "name")]
    pub label: String,
}

impl Position {
    /// The server sends a list of `{value, label}` or a plain `{value: label}` map
    pub fn list_from_value(value: serde_json::Value) -> Result<Vec<Position>> {
        match value {
            serde_json::Value::Object(map) if !map.values().any(|v| v.is_object()) => Ok(map
                .into_iter()
                .map(|(value, label)| Position {
                    label: label.as_str().map(str::to_string).unwrap_or_else(|| label.to_string()),
                    value,
                })
                .collect()),
            other => Ok(serde_json::from_value(other)?),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Email,
    Checkbox,
    #[serde(alias = "dropdown", alias = "option")]
    Select,
    #[serde(other)]
    Other,
}

/// Admin-defined form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraField {
    pub field_name: String,
    #[serde(default = "text_field")]
    pub field_type: FieldType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

fn text_field() -> FieldType {
    FieldType::Text
}

/// Employee form input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub position: String,
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
}

impl NewEmployee {
    /// Check the form fields; `extra_fields` are checked against the field definitions
    pub fn validate(&self, fields: &[ExtraField]) -> Result<()> {
        let mut errors = ValidationErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        } else if !NAME_CHARS.is_match(name) {
            errors.add("name", "Name can only contain letters and spaces");
        } else if name.chars().count() < 2 {
            errors.add("name", "Name must be at least 2 characters long");
        }

        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if !EMAIL.is_match(self.email.trim()) {
            errors.add("email", "Please enter a valid email address");
        }

        if self.phone.trim().is_empty() {
            errors.add("phone", "Phone number is required");
        } else if !PHONE.is_match(self.phone.trim()) {
            errors.add("phone", "Please enter a valid 10-digit phone number");
        }

        if self.address.trim().is_empty() {
            errors.add("address", "Address is required");
        }

        if self.position.trim().is_empty() {
            errors.add("position", "Please select a position");
        }

        for field in fields.iter().filter(|f| f.required) {
            let filled = self
                .extra_fields
                .get(&field.field_name)
                .map_or(false, |v| !v.trim().is_empty());
            if !filled {
                errors.add(&field.field_name, &format!("{} is required", field.field_name));
            }
        }

        errors.into_result()
    }
}

/// Password given to a new employee's sign-in account: the name without spaces, lowercased, plus `@123`
pub fn default_password(name: &str) -> String {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{}@123", compact.to_lowercase())
}

/// Body of `POST /register-employee/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub position: String,
    pub extra_fields: BTreeMap<String, String>,
    pub firebase_uid: Option<String>,
}

impl EmployeeRegistration {
    pub fn new(employee: &NewEmployee, firebase_uid: Option<String>) -> Self {
        Self {
            name: employee.name.trim().to_string(),
            email: employee.email.trim().to_string(),
            phone: employee.phone.trim().to_string(),
            address: employee.address.trim().to_string(),
            position: employee.position.clone(),
            extra_fields: employee.extra_fields.clone(),
            firebase_uid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedEmployee {
    pub id: i64,
    pub name: String,
}

/// Employees allocated to one position of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedSection {
    #[serde(alias = "category")]
    pub position: String,
    #[serde(default)]
    pub employees: Vec<AllocatedEmployee>,
}

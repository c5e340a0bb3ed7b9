use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;

/// A meal slot within a day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub order: u32,
}

impl MealCategory {
    pub fn new(name: &str, order: u32) -> Self {
        Self {
            id: Self::slug(name),
            name: name.trim().to_string(),
            items: Vec::new(),
            order,
        }
    }

    /// `"Evening Snacks"` to `"evening-snacks"`
    pub fn slug(name: &str) -> String {
        name.trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// One event day with its ordered meals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub id: u32,
    #[serde(default, with = "dates::serde_flexible")]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "mealCategories")]
    pub meals: Vec<MealCategory>,
}

/// Body of `POST /scan-meals/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRequest {
    pub event_id: i64,
    pub meal_type: String,
    #[serde(with = "dates::serde_flexible", skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
}

/// Server answer to a meal scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub meal_type: Option<String>,
    #[serde(default, alias = "count")]
    pub new_count: Option<u64>,
    #[serde(default, alias = "name")]
    pub attendee_name: Option<String>,
}

/// Server answer to an employee check-in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckInReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "checkin_time")]
    pub checked_in_at: Option<String>,
}

/// A meal taken by an attendee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMeal {
    #[serde(alias = "meal_category", alias = "meal")]
    pub meal_type: String,
    #[serde(default, with = "dates::serde_flexible")]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "scanned_time", alias = "time")]
    pub scanned_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A meal allotted for the event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedMeal {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(alias = "meal_category", alias = "name")]
    pub meal_type: String,
    #[serde(default, with = "dates::serde_flexible")]
    pub date: Option<NaiveDate>,
}

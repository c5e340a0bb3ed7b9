//! Date formats used by the dashboards
//!
//! Tables show `DD-MM-YYYY`; form inputs and the API use `YYYY-MM-DD`.

use chrono::NaiveDate;

use crate::error::{Error, Result};

pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";
pub const INPUT_FORMAT: &str = "%Y-%m-%d";

/// Parses `value` and requires it to be the canonical, zero-padded rendering of the date
fn parse_strict(value: &str, format: &str) -> Result<NaiveDate> {
    let value = value.trim();
    let date = NaiveDate::parse_from_str(value, format)
        .map_err(|e| Error::InvalidDate(format!("{} ({})", value, e)))?;
    if date.format(format).to_string() != value {
        return Err(Error::InvalidDate(format!("{} (expected {})", value, format)));
    }
    Ok(date)
}

pub fn parse_display(value: &str) -> Result<NaiveDate> {
    parse_strict(value, DISPLAY_FORMAT)
}

pub fn parse_input(value: &str) -> Result<NaiveDate> {
    parse_strict(value, INPUT_FORMAT)
}

/// Either `YYYY-MM-DD` (a trailing time part is ignored) or `DD-MM-YYYY`
pub fn parse_any(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    let date_part = value.split(|c: char| c == 'T' || c == ' ').next().unwrap_or(value);
    parse_input(date_part).or_else(|_| parse_display(date_part))
}

pub fn format_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

pub fn format_input(date: NaiveDate) -> String {
    date.format(INPUT_FORMAT).to_string()
}

/// `"25-12-2024"` to `"2024-12-25"`
pub fn display_to_input(value: &str) -> Result<String> {
    parse_display(value).map(format_input)
}

/// `"2024-12-25"` to `"25-12-2024"`
pub fn input_to_display(value: &str) -> Result<String> {
    parse_input(value).map(format_display)
}

/// Number of calendar days from `start` to `end`, both included; 0 when `end` is before `start`
pub fn event_day_count(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days();
    if days < 0 {
        0
    } else {
        days as u32 + 1
    }
}

/// Every date from `start` through `end`
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Serde adapters for optional dates that may arrive in either format
pub mod serde_flexible {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&super::format_input(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_any(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[serde(alias = "Upcoming")]
    Upcoming,
    #[serde(alias = "Ongoing")]
    Ongoing,
    #[serde(alias = "Completed")]
    Completed,
    #[serde(alias = "Cancelled", alias = "canceled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Completed", alias = "paid", alias = "Paid")]
    Completed,
    #[serde(alias = "Failed")]
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(alias = "event_name")]
    pub name: String,
    #[serde(default, with = "dates::serde_flexible")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "dates::serde_flexible")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub seats_booked: Option<u32>,
    #[serde(default, alias = "total_seats")]
    pub seats_total: Option<u32>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, alias = "status")]
    pub event_status: Option<EventStatus>,
    #[serde(default, alias = "eventgroup", alias = "event_group")]
    pub event_group_id: Option<i64>,
}

impl Event {
    /// Calendar days covered, both ends included
    pub fn day_count(&self) -> Option<u32> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(dates::event_day_count(start, end)),
            _ => None,
        }
    }

    pub fn seats_available(&self) -> Option<u32> {
        Some(self.seats_total?.saturating_sub(self.seats_booked.unwrap_or(0)))
    }
}

/// Partial update; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seats_booked: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_status: Option<EventStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(with = "dates::serde_flexible")]
    pub start_date: Option<NaiveDate>,
    #[serde(with = "dates::serde_flexible")]
    pub end_date: Option<NaiveDate>,
    pub venue: String,
    pub seats_total: u32,
}

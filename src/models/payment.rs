use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::event::PaymentStatus;
use crate::dates;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub event_id: i64,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub event_group: Option<String>,
    pub amount: f64,
    pub status: PaymentStatus,
    #[serde(default, with = "dates::serde_flexible", alias = "payment_date")]
    pub paid_on: Option<NaiveDate>,
}

/// One month on the superadmin yearly chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    #[serde(alias = "name")]
    pub month: String,
    #[serde(default)]
    pub events: u32,
    #[serde(default)]
    pub revenue: f64,
}

/// Total revenue over the completed payments
pub fn collected_revenue(records: &[PaymentRecord]) -> f64 {
    records
        .iter()
        .filter(|r| r.status == PaymentStatus::Completed)
        .map(|r| r.amount)
        .sum()
}

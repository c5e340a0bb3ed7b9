//! Wire types shared by the API clients

mod employee;
mod event;
mod event_group;
mod meal;
mod payment;
mod registration;

pub use employee::{
    default_password, AllocatedEmployee, AllocatedSection, Employee, EmployeeRegistration,
    ExtraField, FieldType, NewEmployee, Position,
};
pub use event::{Event, EventStatus, EventUpdate, NewEvent, PaymentStatus};
pub use event_group::{EventGroup, EventGroupUpdate, NewEventGroup};
pub use meal::{
    AllocatedMeal, CheckInReceipt, Day, MealCategory, ScanReceipt, ScanRequest, UserMeal,
};
pub use payment::{collected_revenue, ChartPoint, PaymentRecord};
pub use registration::{AttendeeRegistration, RegisteredUser, WelcomeInfo};

pub use event_staffing_realtime::MealScan;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Response envelope: `{status, status_code, message, data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// `status` decides when present, then `status_code`; a bare body counts as success
    pub fn is_success(&self) -> bool {
        match (&self.status, self.status_code) {
            (Some(status), _) => status.eq_ignore_ascii_case("success"),
            (None, Some(code)) => (200..300).contains(&code),
            (None, None) => true,
        }
    }

    pub fn into_result(self) -> Result<ApiResponse<T>> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::api(
                self.status_code.unwrap_or(200),
                self.message.unwrap_or_default(),
            ))
        }
    }

    /// The payload of a successful response
    pub fn into_data(self) -> Result<T> {
        self.into_result()?
            .data
            .ok_or_else(|| Error::general("Response did not contain data"))
    }
}

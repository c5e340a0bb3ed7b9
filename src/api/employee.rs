use serde_json::json;

use crate::error::Result;
use crate::fetch::ApiClient;
use crate::models::{CheckInReceipt, Day, Employee, Event, ScanReceipt, ScanRequest};
use crate::scan::QrIdentity;

/// Endpoints used by staff at the venue
#[derive(Clone)]
pub struct EmployeeApi {
    api: ApiClient,
}

impl EmployeeApi {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// The signed-in employee, as printed on their ID card
    pub async fn profile(&self) -> Result<Employee> {
        self.api.get("/employees-id-card-login/").send_data().await
    }

    pub async fn upcoming_events(&self) -> Result<Vec<Event>> {
        self.api
            .get("/employees-upcoming-event-details/")
            .send_data()
            .await
    }

    pub async fn meal_days(&self, event_id: i64) -> Result<Vec<Day>> {
        self.api
            .get(&format!("/event-meals/{}/", event_id))
            .send_data()
            .await
    }

    pub async fn scan_meal(&self, request: &ScanRequest) -> Result<ScanReceipt> {
        let (message, mut receipt): (_, ScanReceipt) = self
            .api
            .post("/scan-meals/")
            .json(request)?
            .send_with_message()
            .await?;
        if receipt.message.is_none() {
            receipt.message = message;
        }
        Ok(receipt)
    }

    pub async fn check_in(&self, event_id: i64, identity: &QrIdentity) -> Result<CheckInReceipt> {
        let body = json!({
            "event_id": event_id,
            "email": identity.email(),
            "unique_id": identity.unique_id(),
        });
        let (message, mut receipt): (_, CheckInReceipt) = self
            .api
            .post("/employee-checkin/")
            .json(&body)?
            .send_with_message()
            .await?;
        if receipt.message.is_none() {
            receipt.message = message;
        }
        Ok(receipt)
    }
}

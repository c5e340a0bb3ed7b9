use event_staffing_auth::FirebaseAuth;
use log::info;
use serde_json::json;

use crate::error::Result;
use crate::fetch::ApiClient;
use crate::models::{
    ChartPoint, Event, EventGroup, EventGroupUpdate, NewEvent, NewEventGroup, PaymentRecord,
    PaymentStatus,
};

/// Platform-wide management of event groups, events and payments
#[derive(Clone)]
pub struct SuperadminApi {
    api: ApiClient,
}

impl SuperadminApi {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list_event_groups(&self) -> Result<Vec<EventGroup>> {
        self.api.get("/api/event-groups/").send_data().await
    }

    pub async fn get_event_group(&self, id: i64) -> Result<EventGroup> {
        self.api
            .get(&format!("/api/event-groups/{}", id))
            .send_data()
            .await
    }

    pub async fn create_event_group(&self, group: &NewEventGroup) -> Result<EventGroup> {
        self.api
            .post("/api/event-groups/")
            .json(group)?
            .send_data()
            .await
    }

    /// Edit one section of a group's profile
    pub async fn update_event_group(&self, id: i64, update: &EventGroupUpdate) -> Result<EventGroup> {
        self.api
            .patch(&format!("/api/event-groups/{}", id))
            .json(update)?
            .send_data()
            .await
    }

    /// Delete a group. When `account` is given, the group's sign-in account is
    /// removed from Firebase first and a failure there aborts the deletion.
    pub async fn delete_event_group(
        &self,
        id: i64,
        account: Option<(&FirebaseAuth, &str)>,
    ) -> Result<()> {
        if let Some((firebase, id_token)) = account {
            firebase.delete_account(id_token).await?;
            info!("Deleted sign-in account of event group {}", id);
        }
        self.api
            .delete(&format!("/api/event-groups/{}", id))
            .send_ack()
            .await?;
        Ok(())
    }

    pub async fn list_events(&self) -> Result<Vec<Event>> {
        self.api.get("/events/").send_data().await
    }

    pub async fn list_event_group_events(&self, group_id: i64) -> Result<Vec<Event>> {
        self.api
            .get(&format!("/api/event-groups/{}/events", group_id))
            .send_data()
            .await
    }

    pub async fn create_event_for_group(&self, group_id: i64, event: &NewEvent) -> Result<Event> {
        self.api
            .post(&format!("/api/event-groups/{}/events", group_id))
            .json(event)?
            .send_data()
            .await
    }

    pub async fn list_expired_events(&self) -> Result<Vec<Event>> {
        self.api.get("/expired-events/").send_data().await
    }

    pub async fn payment_history(&self) -> Result<Vec<PaymentRecord>> {
        self.api.get("/payment-history/").send_data().await
    }

    pub async fn update_payment_status(&self, event_id: i64, status: PaymentStatus) -> Result<Event> {
        self.api
            .patch(&format!("/events/{}/payment-status/", event_id))
            .json(&json!({ "payment_status": status }))?
            .send_data()
            .await
    }

    /// Monthly events and revenue for `year`
    pub async fn chart_data(&self, year: i32) -> Result<Vec<ChartPoint>> {
        self.api
            .get("/chart-data/")
            .query("year", year)
            .send_data()
            .await
    }
}

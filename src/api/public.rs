use super::ExtraFieldsPayload;
use crate::error::Result;
use crate::fetch::ApiClient;
use crate::models::{AttendeeRegistration, ExtraField};

/// Attendee self-registration; no session needed
#[derive(Clone)]
pub struct PublicApi {
    api: ApiClient,
}

impl PublicApi {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn registration_fields(&self) -> Result<Vec<ExtraField>> {
        let payload: ExtraFieldsPayload = self.api.get("/add-user-extrafield/").send_data().await?;
        Ok(payload.into_fields())
    }

    pub async fn register_attendee(&self, registration: &AttendeeRegistration) -> Result<Option<String>> {
        self.api
            .post("/user-registration/")
            .json(registration)?
            .send_ack()
            .await
    }
}

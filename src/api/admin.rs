use std::path::Path;

use event_staffing_auth::FirebaseAuth;
use log::{error, info, warn};
use serde_json::json;

use super::ExtraFieldsPayload;
use crate::error::Result;
use crate::fetch::ApiClient;
use crate::models::{
    default_password, AllocatedMeal, AllocatedSection, CheckInReceipt, Employee,
    EmployeeRegistration, Event, EventStatus, EventUpdate, ExtraField, NewEmployee, Position,
    RegisteredUser, UserMeal, WelcomeInfo,
};
use crate::schedule::MealPlan;

/// Endpoints of an event group's admin dashboard
#[derive(Clone)]
pub struct AdminApi {
    api: ApiClient,
}

impl AdminApi {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Events of the signed-in admin's group
    pub async fn assigned_events(&self) -> Result<Vec<Event>> {
        self.api.get("/login-eventgroup-event/").send_data().await
    }

    pub async fn welcome(&self) -> Result<WelcomeInfo> {
        self.api.get("/welcome-eventgroup-name/").send_data().await
    }

    /// Logo URL of the group; a failed lookup is logged and treated as no logo
    pub async fn event_logo(&self) -> Option<String> {
        match self.welcome().await {
            Ok(info) => info.logo,
            Err(e) => {
                warn!("Failed to fetch event logo: {}", e);
                None
            }
        }
    }

    pub async fn update_event(&self, event_id: i64, update: &EventUpdate) -> Result<Event> {
        self.api
            .patch(&format!("/events/{}/", event_id))
            .json(update)?
            .send_data()
            .await
    }

    pub async fn update_event_status(&self, event_id: i64, status: EventStatus) -> Result<Event> {
        let update = EventUpdate {
            event_status: Some(status),
            ..Default::default()
        };
        self.update_event(event_id, &update).await
    }

    pub async fn delete_event(&self, event_id: i64) -> Result<()> {
        self.api
            .delete(&format!("/events/{}/", event_id))
            .send_ack()
            .await?;
        Ok(())
    }

    pub async fn position_choices(&self) -> Result<Vec<Position>> {
        let value: serde_json::Value = self.api.get("/position-choices/").send_data().await?;
        Position::list_from_value(value)
    }

    pub async fn add_position_choice(&self, label: &str) -> Result<Option<String>> {
        self.api
            .post("/position-choices/")
            .json(&json!({ "position": label }))?
            .send_ack()
            .await
    }

    pub async fn delete_position_choice(&self, value: &str) -> Result<Option<String>> {
        self.api
            .delete("/position-choices/")
            .json(&json!({ "position": value }))?
            .send_ack()
            .await
    }

    /// Custom fields the group added to the employee form
    pub async fn employee_extra_fields(&self) -> Result<Vec<ExtraField>> {
        let payload: ExtraFieldsPayload = self
            .api
            .get("/add-employee-extrafields/")
            .send_data()
            .await?;
        Ok(payload.into_fields())
    }

    pub async fn add_employee_extra_field(&self, field: &ExtraField) -> Result<Option<String>> {
        self.api
            .post("/add-employee-extrafields/")
            .json(field)?
            .send_ack()
            .await
    }

    /// Validate the form against `fields`, then register the employee
    pub async fn register_employee(
        &self,
        employee: &NewEmployee,
        fields: &[ExtraField],
        firebase_uid: Option<String>,
    ) -> Result<Option<String>> {
        employee.validate(fields)?;
        let body = EmployeeRegistration::new(employee, firebase_uid);
        self.api
            .post("/register-employee/")
            .json(&body)?
            .send_ack()
            .await
    }

    /// Create the employee's Firebase account with the default password, then
    /// register them. The account is deleted again if registration fails.
    pub async fn register_employee_with_account(
        &self,
        employee: &NewEmployee,
        fields: &[ExtraField],
        firebase: &FirebaseAuth,
    ) -> Result<Option<String>> {
        employee.validate(fields)?;

        let password = default_password(&employee.name);
        let account = firebase.sign_up(employee.email.trim(), &password).await?;
        info!("Created sign-in account for {}", employee.email.trim());

        match self.register_employee(employee, fields, account.uid.clone()).await {
            Ok(message) => Ok(message),
            Err(e) => {
                warn!("Employee registration failed, removing sign-in account: {}", e);
                if let Err(delete_err) = firebase.delete_account(&account.id_token).await {
                    error!("Failed to remove orphaned sign-in account: {}", delete_err);
                }
                Err(e)
            }
        }
    }

    pub async fn employee_details(&self, employee_id: i64) -> Result<Employee> {
        self.api
            .get(&format!("/employee-details/{}/", employee_id))
            .send_data()
            .await
    }

    pub async fn list_employees(&self) -> Result<Vec<Employee>> {
        self.api.get("/api/employees/").send_data().await
    }

    pub async fn delete_employee(&self, employee_id: i64) -> Result<()> {
        self.api
            .delete(&format!("/api/employees/{}", employee_id))
            .send_ack()
            .await?;
        Ok(())
    }

    pub async fn allocate_employees(
        &self,
        event_id: i64,
        sections: &[AllocatedSection],
    ) -> Result<Option<String>> {
        self.api
            .post("/employee-allocation/")
            .json(&json!({ "event_id": event_id, "allocations": sections }))?
            .send_ack()
            .await
    }

    pub async fn remove_allocation(&self, event_id: i64, employee_id: i64) -> Result<Option<String>> {
        self.api
            .delete("/employee-allocation/")
            .json(&json!({ "event_id": event_id, "employee_id": employee_id }))?
            .send_ack()
            .await
    }

    pub async fn registered_users(&self) -> Result<Vec<RegisteredUser>> {
        self.api.get("/registered-users/").send_data().await
    }

    pub async fn user_details(&self, user_id: i64) -> Result<RegisteredUser> {
        self.api
            .get(&format!("/user-details/{}/", user_id))
            .send_data()
            .await
    }

    pub async fn user_meals(&self, user_id: i64) -> Result<Vec<UserMeal>> {
        self.api
            .get(&format!("/api/user-meals/{}/", user_id))
            .send_data()
            .await
    }

    pub async fn allocated_meals(&self) -> Result<Vec<AllocatedMeal>> {
        self.api.get("/allocated-meals-list/").send_data().await
    }

    pub async fn checkin_details(&self) -> Result<Vec<CheckInReceipt>> {
        self.api.get("/employee-checkin-details/").send_data().await
    }

    pub async fn save_meal_schedule(&self, event_id: i64, plan: &MealPlan) -> Result<Option<String>> {
        self.api
            .post("/meal-schedule/")
            .json(&json!({ "event_id": event_id, "days": plan.days() }))?
            .send_ack()
            .await
    }

    /// Upload the group's display picture as the `image` form field
    pub async fn update_event_photo(&self, bytes: Vec<u8>, filename: &str) -> Result<Option<String>> {
        self.api
            .patch("/update-event-dp/")
            .file("image", bytes, filename, image_mime(filename))
            .send_ack()
            .await
    }
}

fn image_mime(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

//! Event Staffing Rust Client Library
//!
//! A Rust client for the event staffing service: role-based REST APIs for
//! superadmins, event group admins, employees and attendees, session handling
//! with automatic token refresh, the QR scan workflow used at meal counters
//! and check-in desks, and the live meal-count feed.

pub mod allocation;
pub mod api;
pub mod config;
pub mod dates;
pub mod error;
pub mod fetch;
pub mod models;
pub mod routing;
pub mod scan;
pub mod schedule;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use event_staffing_auth::{
    AuthClient, AuthOptions, FileTokenStore, FirebaseAuth, LoginOutcome, Tokens, UserData,
};
use event_staffing_realtime::{ClientType, MealUpdatesClient, MealUpdatesOptions};
use log::info;
use reqwest::Client;
use tokio::sync::broadcast;

use crate::api::{AdminApi, EmployeeApi, PublicApi, SuperadminApi};
use crate::config::ClientOptions;
use crate::error::Result;
use crate::fetch::{ApiClient, AuthEvent};
use crate::scan::{MealScanSubmitter, ScanStation, ScanSubmitter};

pub use event_staffing_auth as auth;
pub use event_staffing_realtime as realtime;

/// The main entry point for the event staffing client
pub struct EventStaffing {
    /// Client options
    pub options: ClientOptions,
    auth: AuthClient,
    api: ApiClient,
    meal_updates: Arc<MealUpdatesClient>,
}

impl EventStaffing {
    /// Create a new client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use event_staffing::{EventStaffing, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_firebase_api_key("firebase-web-key");
    /// let client = EventStaffing::new(options).unwrap();
    /// ```
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http_client = Client::builder().timeout(options.request_timeout).build()?;

        let tokens = match &options.token_store_path {
            Some(path) => Tokens::new(Arc::new(FileTokenStore::open(path)?)),
            None => Tokens::in_memory(),
        };

        let firebase = options.firebase_api_key.as_deref().map(|key| {
            FirebaseAuth::with_base_url(&options.firebase_base_url, key, http_client.clone())
        });

        let auth = AuthClient::new(
            &options.base_url,
            http_client.clone(),
            tokens.clone(),
            firebase,
            AuthOptions {
                auto_refresh_token: options.auto_refresh_token,
                ..Default::default()
            },
        );
        let api = ApiClient::new(http_client, tokens, auth.refresher(), &options);

        let meal_updates = Arc::new(MealUpdatesClient::new_with_options(
            &options.websocket_url,
            MealUpdatesOptions {
                client_type: ClientType::Scanner,
                max_reconnect_attempts: options.max_reconnect_attempts,
                reconnect_interval: options.reconnect_delay.as_millis() as u64,
                ..Default::default()
            },
        ));

        Ok(Self {
            options,
            auth,
            api,
            meal_updates,
        })
    }

    /// Create a client configured from `EVENT_STAFFING_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::from_env())
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn superadmin(&self) -> SuperadminApi {
        SuperadminApi::new(self.api.clone())
    }

    pub fn admin(&self) -> AdminApi {
        AdminApi::new(self.api.clone())
    }

    pub fn employee(&self) -> EmployeeApi {
        EmployeeApi::new(self.api.clone())
    }

    pub fn public(&self) -> PublicApi {
        PublicApi::new(self.api.clone())
    }

    pub fn meal_updates(&self) -> Arc<MealUpdatesClient> {
        self.meal_updates.clone()
    }

    /// Session changes, including the forced logout after a failed refresh
    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.api.subscribe()
    }

    pub async fn health_check(&self) -> bool {
        self.api.health_check().await
    }

    /// A scan station using the configured rearm delay
    pub fn scan_station(&self, submitter: Arc<dyn ScanSubmitter>) -> ScanStation {
        ScanStation::new(submitter, self.options.scan_rearm_delay)
    }

    /// A station counting `meal_type` for an event, optionally publishing new counts to the live feed
    pub fn meal_scan_station(
        &self,
        event_id: i64,
        meal_type: &str,
        date: Option<NaiveDate>,
        broadcast: bool,
    ) -> ScanStation {
        let submitter = MealScanSubmitter::new(self.employee(), event_id, meal_type, date);
        let station = self.scan_station(Arc::new(submitter));
        if broadcast {
            station.with_broadcaster(self.meal_updates.clone())
        } else {
            station
        }
    }

    pub fn scan_rearm_delay(&self) -> Duration {
        self.options.scan_rearm_delay
    }

    fn signed_in(&self, outcome: LoginOutcome) -> UserData {
        self.api.mark_signed_in(outcome.user.role);
        outcome.user
    }

    pub async fn login_with_email(&self, email: &str, password: &str) -> Result<UserData> {
        let outcome = self.auth.login_with_email(email, password).await?;
        Ok(self.signed_in(outcome))
    }

    pub async fn login_with_google(&self, google_id_token: &str) -> Result<UserData> {
        let outcome = self.auth.login_with_google(google_id_token).await?;
        Ok(self.signed_in(outcome))
    }

    pub async fn login_with_custom_token(&self, custom_token: &str) -> Result<UserData> {
        let outcome = self.auth.login_with_custom_token(custom_token).await?;
        Ok(self.signed_in(outcome))
    }

    pub async fn superadmin_login(&self, email: &str, password: &str) -> Result<UserData> {
        let outcome = self.auth.superadmin_login(email, password).await?;
        Ok(self.signed_in(outcome))
    }

    pub fn logout(&self) -> Result<()> {
        self.auth.logout()?;
        self.api.mark_signed_out();
        info!("Signed out");
        Ok(())
    }

    pub fn current_user(&self) -> Option<UserData> {
        self.auth.current_user()
    }
}

/// Common imports
pub mod prelude {
    pub use crate::api::{AdminApi, EmployeeApi, PublicApi, SuperadminApi};
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, Result};
    pub use crate::fetch::AuthEvent;
    pub use crate::models::*;
    pub use crate::routing::{authorize, Access, Route};
    pub use crate::scan::{extract_identity, QrIdentity, ScanOutcome, ScanStation};
    pub use crate::EventStaffing;
    pub use event_staffing_auth::{Role, UserData};
    pub use event_staffing_realtime::{ConnectionState, MealUpdatesClient};
}

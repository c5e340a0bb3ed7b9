//! Configuration options for the event staffing client

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use event_staffing_auth::DEFAULT_FIREBASE_BASE_URL;
use event_staffing_realtime::DEFAULT_MEAL_UPDATES_URL;

pub const DEFAULT_BASE_URL: &str = "https://event.neurocode.in/webapi";

/// Configuration options for the event staffing client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// REST API root
    pub base_url: String,

    /// Meal updates WebSocket endpoint
    pub websocket_url: String,

    pub request_timeout: Duration,

    pub health_check_timeout: Duration,

    /// Refresh and replay once when a request comes back 401
    pub auto_refresh_token: bool,

    pub firebase_api_key: Option<String>,

    pub firebase_base_url: String,

    /// Pause after a scan result is dismissed before the next decode is accepted
    pub scan_rearm_delay: Duration,

    pub max_reconnect_attempts: u32,

    pub reconnect_delay: Duration,

    /// JSON file for tokens; in-memory when unset
    pub token_store_path: Option<PathBuf>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            websocket_url: DEFAULT_MEAL_UPDATES_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            health_check_timeout: Duration::from_secs(5),
            auto_refresh_token: true,
            firebase_api_key: None,
            firebase_base_url: DEFAULT_FIREBASE_BASE_URL.to_string(),
            scan_rearm_delay: Duration::from_millis(1500),
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(3),
            token_store_path: None,
        }
    }
}

impl ClientOptions {
    /// Defaults overridden by `EVENT_STAFFING_*` environment variables
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(value) = env::var("EVENT_STAFFING_BASE_URL") {
            options.base_url = value;
        }
        if let Ok(value) = env::var("EVENT_STAFFING_WS_URL") {
            options.websocket_url = value;
        }
        if let Ok(value) = env::var("EVENT_STAFFING_FIREBASE_API_KEY") {
            options.firebase_api_key = Some(value);
        }
        if let Ok(value) = env::var("EVENT_STAFFING_TOKEN_STORE") {
            options.token_store_path = Some(PathBuf::from(value));
        }
        match env::var("EVENT_STAFFING_REQUEST_TIMEOUT_SECS").map(|v| v.parse::<u64>()) {
            Ok(Ok(secs)) => options.request_timeout = Duration::from_secs(secs),
            Ok(Err(e)) => log::warn!("Ignoring EVENT_STAFFING_REQUEST_TIMEOUT_SECS: {}", e),
            Err(_) => {}
        }
        options
    }

    pub fn with_base_url(mut self, value: &str) -> Self {
        self.base_url = value.trim_end_matches('/').to_string();
        self
    }

    pub fn with_websocket_url(mut self, value: &str) -> Self {
        self.websocket_url = value.to_string();
        self
    }

    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn with_health_check_timeout(mut self, value: Duration) -> Self {
        self.health_check_timeout = value;
        self
    }

    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Enables Firebase sign-in
    pub fn with_firebase_api_key(mut self, value: &str) -> Self {
        self.firebase_api_key = Some(value.to_string());
        self
    }

    pub fn with_firebase_base_url(mut self, value: &str) -> Self {
        self.firebase_base_url = value.to_string();
        self
    }

    pub fn with_scan_rearm_delay(mut self, value: Duration) -> Self {
        self.scan_rearm_delay = value;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, value: u32) -> Self {
        self.max_reconnect_attempts = value;
        self
    }

    pub fn with_reconnect_delay(mut self, value: Duration) -> Self {
        self.reconnect_delay = value;
        self
    }

    pub fn with_token_store_path(mut self, value: impl Into<PathBuf>) -> Self {
        self.token_store_path = Some(value.into());
        self
    }
}

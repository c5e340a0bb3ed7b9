use serde::{Deserialize, Deserializer, Serialize};

/// Which dashboard a connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Admin,
    Employee,
    Scanner,
}

impl Default for ClientType {
    fn default() -> Self {
        Self::Admin
    }
}

/// One meal scan broadcast to every station in the event room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealScan {
    pub meal_type: String,
    pub new_count: u64,
    #[serde(default, deserialize_with = "lenient_event_id")]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Messages pushed by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    Connected {
        #[serde(default)]
        message: Option<String>,
        #[serde(default, deserialize_with = "lenient_event_id")]
        event_id: Option<i64>,
    },
    RoomJoinSuccess {
        #[serde(default, deserialize_with = "lenient_event_id")]
        event_id: Option<i64>,
        #[serde(default)]
        client_type: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(alias = "meal_scanned")]
    MealScanned(MealScan),
    Error {
        #[serde(default)]
        message: String,
    },
}

/// Messages sent to the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    JoinRoom {
        event_id: i64,
        client_type: ClientType,
    },
    MealScanned {
        meal_type: String,
        new_count: u64,
        timestamp: String,
    },
}

impl ClientMessage {
    /// `MEAL_SCANNED` stamped with the current time
    pub fn meal_scanned(meal_type: &str, new_count: u64) -> Self {
        Self::MealScanned {
            meal_type: meal_type.to_string(),
            new_count,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The server sends `event_id` as a number in broadcasts and as a string elsewhere
fn lenient_event_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(id)) => Some(id),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

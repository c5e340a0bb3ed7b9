use serde::{Deserialize, Serialize};

use super::event::Event;

/// Tenant organisation owning events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventGroup {
    pub id: i64,
    #[serde(alias = "eventGroup", alias = "event_group", alias = "name")]
    pub company_name: String,
    #[serde(default, alias = "ownerName")]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEventGroup {
    pub company_name: String,
    pub owner_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Profile edit, sent as `{section, data}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "section", content = "data", rename_all = "kebab-case")]
pub enum EventGroupUpdate {
    #[serde(rename_all = "camelCase")]
    BasicInfo {
        event_group_name: String,
        owner_name: String,
    },
    ContactInfo {
        email: String,
        phone: String,
        address: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_update_wire_shape() {
        let update = EventGroupUpdate::BasicInfo {
            event_group_name: "Acme Events".to_string(),
            owner_name: "Sam".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "section": "basic-info",
                "data": { "eventGroupName": "Acme Events", "ownerName": "Sam" }
            })
        );
    }

    #[test]
    fn test_group_from_profile_payload() {
        let group: EventGroup = serde_json::from_value(json!({
            "id": 2,
            "eventGroup": "Acme Events",
            "ownerName": "Sam",
            "email": "sam@acme.test"
        }))
        .unwrap();
        assert_eq!(group.company_name, "Acme Events");
        assert_eq!(group.owner_name.as_deref(), Some("Sam"));
        assert!(group.events.is_empty());
    }
}

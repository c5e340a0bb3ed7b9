use std::time::Duration;

use event_staffing::auth::Tokens;
use event_staffing::config::ClientOptions;
use event_staffing::error::Error;
use event_staffing::fetch::AuthEvent;
use event_staffing::models::{NewEmployee, PaymentStatus};
use event_staffing::state::{EventGroupList, EventList};
use event_staffing::EventStaffing;
use futures_util::future::join_all;
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> EventStaffing {
    let options = ClientOptions::default()
        .with_base_url(&server.uri())
        .with_firebase_api_key("test-api-key")
        .with_firebase_base_url(&server.uri())
        .with_request_timeout(Duration::from_secs(5));
    EventStaffing::new(options).unwrap()
}

fn signed_in(client: &EventStaffing, access: &str) -> Tokens {
    let tokens = client.auth().tokens().clone();
    tokens.set_tokens(access, "refresh-1").unwrap();
    tokens.set_firebase_token("firebase-1").unwrap();
    tokens
}

fn events_body() -> serde_json::Value {
    json!({
        "status": "Success",
        "status_code": 200,
        "data": [
            { "id": 1, "name": "Tech Summit", "start_date": "2024-03-01", "end_date": "2024-03-03" },
            { "id": 2, "name": "Food Fest", "event_status": "ongoing" }
        ]
    })
}

#[tokio::test]
async fn test_requests_carry_both_tokens() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login-eventgroup-event/"))
        .and(header("Authorization", "Bearer access-1"))
        .and(header("Firebase-Token", "firebase-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    signed_in(&client, "access-1");

    let events = client.admin().assigned_events().await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].day_count(), Some(3));
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login-eventgroup-event/"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login-eventgroup-event/"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body()))
        .expect(5)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh-token/"))
        .and(body_json(json!({ "refresh": "refresh-1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(json!({
                    "status": "Success",
                    "data": { "access": "fresh", "refresh": "refresh-2" }
                })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let tokens = signed_in(&client, "stale");
    let admin = client.admin();

    let results = join_all((0..5).map(|_| admin.assigned_events())).await;
    for result in results {
        assert_eq!(result.unwrap().len(), 2);
    }
    assert_eq!(tokens.access_token().as_deref(), Some("fresh"));
    assert_eq!(tokens.refresh_token().as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_refresh_failure_rejects_all_and_requires_login() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/event-groups/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh-token/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_delay(Duration::from_millis(200))
                .set_body_json(json!({ "detail": "Token is blacklisted" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let tokens = signed_in(&client, "stale");
    let mut events = client.auth_events();
    let superadmin = client.superadmin();

    let results = join_all((0..3).map(|_| superadmin.list_event_groups())).await;
    for result in results {
        assert!(matches!(result, Err(Error::LoginRequired)));
    }

    assert_eq!(events.try_recv().unwrap(), AuthEvent::LoginRequired);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert!(tokens.access_token().is_none());
    assert!(tokens.refresh_token().is_none());
    assert!(tokens.firebase_token().is_none());
}

#[tokio::test]
async fn test_unauthorized_replay_is_not_retried_again() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/employees-id-card-login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Not an employee" })))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh-token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "data": { "access": "fresh", "refresh": "refresh-2" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    signed_in(&client, "stale");

    match client.employee().profile().await {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Not an employee");
        }
        other => panic!("expected a 401 API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_state_keeps_server_message() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/event-groups/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": "Error",
            "message": "Superadmin access required"
        })))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    signed_in(&client, "access-1");

    let mut groups = EventGroupList::default();
    groups.fetch(&client.superadmin()).await;
    assert!(!groups.state.loading);
    assert_eq!(groups.state.error.as_deref(), Some("Superadmin access required"));
    assert!(groups.groups().is_empty());
}

#[tokio::test]
async fn test_event_list_delete_removes_row() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login-eventgroup-event/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body()))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/events/2/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    signed_in(&client, "access-1");
    let admin = client.admin();

    let mut list = EventList::default();
    list.fetch(&admin).await;
    list.delete(&admin, 2).await;
    assert!(list.state.error.is_none());
    assert_eq!(list.events().iter().map(|e| e.id).collect::<Vec<_>>(), vec![1]);
}

#[tokio::test]
async fn test_register_employee_rolls_back_account_on_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(body_json(json!({
            "email": "asha@example.com",
            "password": "ashamenon@123",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": "new-user-token",
            "localId": "uid-42",
            "email": "asha@example.com"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/register-employee/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Error",
            "status_code": 400,
            "message": "Phone number already registered"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:delete"))
        .and(body_json(json!({ "idToken": "new-user-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    signed_in(&client, "access-1");
    let employee = NewEmployee {
        name: "Asha Menon".to_string(),
        email: "asha@example.com".to_string(),
        phone: "9876543210".to_string(),
        address: "12 Beach Road".to_string(),
        position: "server".to_string(),
        ..Default::default()
    };

    let firebase = client.auth().firebase().unwrap();
    let err = client
        .admin()
        .register_employee_with_account(&employee, &[], firebase)
        .await
        .unwrap_err();
    assert_eq!(err.display_message("Registration failed"), "Phone number already registered");
}

#[tokio::test]
async fn test_invalid_employee_is_not_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register-employee/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let result = client
        .admin()
        .register_employee(&NewEmployee::default(), &[], None)
        .await;
    match result {
        Err(Error::Validation(errors)) => assert_eq!(errors.get("name"), Some("Name is required")),
        other => panic!("expected validation errors, got {:?}", other),
    }
}

#[tokio::test]
async fn test_meal_scan_station_submits_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scan-meals/"))
        .and(body_json(json!({
            "event_id": 7,
            "meal_type": "Lunch",
            "date": "2024-03-02",
            "email": "a@b.com"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(100))
                .set_body_json(json!({
                    "status": "Success",
                    "message": "Lunch recorded for Asha",
                    "data": { "meal_type": "Lunch", "new_count": 41 }
                })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    signed_in(&client, "access-1");
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 2);
    let station = client.meal_scan_station(7, "Lunch", date, false);
    station.start().unwrap();

    let (first, second) = tokio::join!(
        station.on_decoded("Name: Asha, Email: a@b.com, Phone: 98"),
        station.on_decoded("Name: Asha, Email: a@b.com, Phone: 98")
    );
    let outcomes: Vec<_> = [first.unwrap(), second.unwrap()].into_iter().flatten().collect();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_accepted());
    assert_eq!(outcomes[0].message(), "Lunch recorded for Asha");
}

#[tokio::test]
async fn test_health_check() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health-check/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&mock_server)
        .await;

    assert!(client(&mock_server).health_check().await);

    let down = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health-check/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&down)
        .await;
    assert!(!client(&down).health_check().await);
}

#[tokio::test]
async fn test_position_choices_from_map() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/position-choices/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "data": { "server": "Server", "chef": "Chef" }
        })))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let positions = client.admin().position_choices().await.unwrap();
    assert_eq!(positions.len(), 2);
    assert!(positions.iter().any(|p| p.value == "chef" && p.label == "Chef"));
}

#[tokio::test]
async fn test_extra_fields_nested_under_data() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/add-employee-extrafields/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "data": { "extra_fields": [
                { "field_name": "t_shirt_size", "field_type": "dropdown", "options": ["M", "L"], "required": true }
            ] }
        })))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let fields = client.admin().employee_extra_fields().await.unwrap();
    assert_eq!(fields.len(), 1);
    assert!(fields[0].required);
}

#[tokio::test]
async fn test_chart_and_payment_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chart-data/"))
        .and(query_param("year", "2024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "month": "Jan", "events": 4, "revenue": 12000.0 }
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/events/3/payment-status/"))
        .and(body_json(json!({ "payment_status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "data": { "id": 3, "name": "Expo", "payment_status": "completed" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let superadmin = client.superadmin();
    let points = superadmin.chart_data(2024).await.unwrap();
    assert_eq!(points[0].events, 4);

    let event = superadmin
        .update_payment_status(3, PaymentStatus::Completed)
        .await
        .unwrap();
    assert_eq!(event.payment_status, Some(PaymentStatus::Completed));
}

#[tokio::test]
async fn test_event_photo_is_multipart() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/update-event-dp/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "message": "Photo updated"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    signed_in(&client, "access-1");
    let message = client
        .admin()
        .update_event_photo(b"\x89PNG fake".to_vec(), "logo.png")
        .await
        .unwrap();
    assert_eq!(message.as_deref(), Some("Photo updated"));

    let requests = mock_server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"image\""));
    assert!(body.contains("filename=\"logo.png\""));
}

#[tokio::test]
async fn test_event_photo_is_resent_after_refresh() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/update-event-dp/"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/update-event-dp/"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "message": "Photo updated"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh-token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "data": { "access": "fresh", "refresh": "refresh-2" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    signed_in(&client, "stale");
    let message = client
        .admin()
        .update_event_photo(b"\x89PNG fake".to_vec(), "logo.png")
        .await
        .unwrap();
    assert_eq!(message.as_deref(), Some("Photo updated"));

    let requests = mock_server.received_requests().await.unwrap();
    let uploads: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/update-event-dp/")
        .collect();
    assert_eq!(uploads.len(), 2);
    for upload in uploads {
        let body = String::from_utf8_lossy(&upload.body);
        assert!(body.contains("name=\"image\""));
        assert!(body.contains("filename=\"logo.png\""));
        assert!(body.contains("PNG fake"));
    }
}

#[tokio::test]
async fn test_file_token_store_survives_restart() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let options = ClientOptions::default()
        .with_base_url(&mock_server.uri())
        .with_token_store_path(&path);
    let first = EventStaffing::new(options.clone()).unwrap();
    first.auth().tokens().set_tokens("a", "r").unwrap();
    drop(first);

    let second = EventStaffing::new(options).unwrap();
    assert_eq!(second.auth().tokens().access_token().as_deref(), Some("a"));
    second.logout().unwrap();
    assert!(second.auth().tokens().refresh_token().is_none());
}

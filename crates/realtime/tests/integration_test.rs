use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use event_staffing_realtime::{
    ConnectionState, MealUpdatesClient, MealUpdatesOptions, RealtimeError,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

// Accepts connections forever; `handler` gets the 1-based connection number
async fn start_mock_server<F, Fut>(handler: F) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn(usize, TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::spawn(handler(n, stream));
        }
    });

    (addr, accepted)
}

// Behaves like the meal updates consumer: greets, confirms joins, and
// rebroadcasts MEAL_SCANNED with the numeric event id
async fn room_server(_n: usize, stream: TcpStream) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let greeting = json!({
        "type": "CONNECTED",
        "message": "WebSocket connection established",
        "event_id": "12"
    });
    if ws.send(Message::Text(greeting.to_string())).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = ws.next().await {
        let Message::Text(text) = msg else { continue };
        let Ok(data) = serde_json::from_str::<Value>(&text) else { continue };
        let reply = match data["type"].as_str() {
            Some("JOIN_ROOM") => json!({
                "type": "ROOM_JOIN_SUCCESS",
                "event_id": data["event_id"].to_string(),
                "client_type": data["client_type"],
                "message": "joined"
            }),
            Some("MEAL_SCANNED") => json!({
                "type": "MEAL_SCANNED",
                "meal_type": data["meal_type"],
                "new_count": data["new_count"],
                "event_id": 12,
                "timestamp": data["timestamp"]
            }),
            _ => continue,
        };
        if ws.send(Message::Text(reply.to_string())).await.is_err() {
            break;
        }
    }
}

fn fast_options(max_reconnect_attempts: u32) -> MealUpdatesOptions {
    MealUpdatesOptions {
        max_reconnect_attempts,
        reconnect_interval: 50,
        connect_timeout: 1000,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_join_room_and_publish_round_trip() {
    let (addr, _) = start_mock_server(room_server).await;
    let client = MealUpdatesClient::new_with_options(&format!("ws://{}/ws/admin/meal_updates/", addr), fast_options(3));
    let mut scans = client.subscribe();
    let mut messages = client.subscribe_messages();

    client.connect(12).await.expect("connect failed");
    assert_eq!(client.get_connection_state().await, ConnectionState::Connected);
    assert_eq!(client.event_id().await, Some(12));

    // CONNECTED then ROOM_JOIN_SUCCESS
    for _ in 0..2 {
        tokio::time::timeout(Duration::from_secs(2), messages.recv())
            .await
            .expect("timed out waiting for server message")
            .unwrap();
    }

    client.publish_meal_scan("Lunch", 41).await.unwrap();
    let scan = tokio::time::timeout(Duration::from_secs(2), scans.recv())
        .await
        .expect("timed out waiting for scan")
        .unwrap();
    assert_eq!(scan.meal_type, "Lunch");
    assert_eq!(scan.new_count, 41);
    assert_eq!(scan.event_id, Some(12));

    client.disconnect().await.unwrap();
    assert_eq!(client.get_connection_state().await, ConnectionState::Disconnected);
    assert!(client.publish_meal_scan("Lunch", 42).await.is_err());
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let (addr, _) = start_mock_server(room_server).await;
    let client = MealUpdatesClient::new_with_options(&format!("ws://{}", addr), fast_options(3));

    client.connect(5).await.unwrap();
    assert!(matches!(
        client.connect(6).await,
        Err(RealtimeError::AlreadyConnected(5))
    ));
    client.disconnect().await.unwrap();
    client.connect(6).await.unwrap();
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_initial_connect_failure_is_returned() {
    // Bind and drop to get a port nobody listens on
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let client = MealUpdatesClient::new_with_options(&format!("ws://{}", addr), fast_options(3));

    assert!(client.connect(1).await.is_err());
    assert_eq!(client.connection_attempts(), 1);
    assert_eq!(client.get_connection_state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_stops_at_ceiling() {
    // First connection is dropped without a close frame; later ones never finish the handshake
    let (addr, accepted) = start_mock_server(|n, stream| async move {
        if n == 1 {
            if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                let _ = ws.next().await;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    })
    .await;

    let client = MealUpdatesClient::new_with_options(&format!("ws://{}", addr), fast_options(3));
    let mut states = client.on_state_change();
    client.connect(9).await.unwrap();

    let mut saw_reconnecting = false;
    loop {
        match tokio::time::timeout(Duration::from_secs(5), states.recv()).await {
            Ok(Ok(ConnectionState::Reconnecting)) => saw_reconnecting = true,
            Ok(Ok(ConnectionState::Disconnected)) if saw_reconnecting => break,
            Ok(Ok(_)) => {}
            other => panic!("unexpected state stream: {:?}", other),
        }
    }

    assert_eq!(client.connection_attempts(), 4);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 4);
    assert_eq!(client.connection_attempts(), 4);
    assert_eq!(client.get_connection_state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_rejoins_room() {
    let joins = Arc::new(AtomicUsize::new(0));
    let seen = joins.clone();
    let (addr, _) = start_mock_server(move |n, stream| {
        let seen = seen.clone();
        async move {
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                if text.contains("JOIN_ROOM") {
                    seen.fetch_add(1, Ordering::SeqCst);
                    if n == 1 {
                        // Drop the first connection abruptly
                        return;
                    }
                }
            }
        }
    })
    .await;

    let client = MealUpdatesClient::new_with_options(&format!("ws://{}", addr), fast_options(3));
    client.connect(3).await.unwrap();

    tokio::time::timeout(Duration::from_secs(3), async {
        while joins.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("room was not rejoined after reconnect");

    assert_eq!(client.get_connection_state().await, ConnectionState::Connected);
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_normal_close_and_manual_disconnect_do_not_reconnect() {
    let (addr, accepted) = start_mock_server(|n, stream| async move {
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        let _ = ws.next().await;
        if n == 1 {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "event closed".into(),
            };
            let _ = ws.close(Some(frame)).await;
        }
        while ws.next().await.is_some() {}
    })
    .await;

    let client = MealUpdatesClient::new_with_options(&format!("ws://{}", addr), fast_options(3));
    client.connect(1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(client.get_connection_state().await, ConnectionState::Disconnected);

    client.connect(1).await.unwrap();
    client.disconnect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

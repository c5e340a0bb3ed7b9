use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, trace, warn};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::Instrument;
use url::Url;

use crate::error::RealtimeError;
use crate::message::{ClientMessage, ClientType, MealScan, ServerMessage};

pub const DEFAULT_MEAL_UPDATES_URL: &str = "wss://event.neurocode.in/ws/admin/meal_updates/";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsReader = SplitStream<WsStream>;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Options for [`MealUpdatesClient`]
#[derive(Debug, Clone)]
pub struct MealUpdatesOptions {
    pub client_type: ClientType,
    pub auto_reconnect: bool,
    /// Consecutive failed reconnects before giving up
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnects (ms)
    pub reconnect_interval: u64,
    /// Ping interval (ms)
    pub heartbeat_interval: u64,
    /// Handshake timeout (ms)
    pub connect_timeout: u64,
    pub channel_capacity: usize,
}

impl Default for MealUpdatesOptions {
    fn default() -> Self {
        Self {
            client_type: ClientType::Admin,
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            reconnect_interval: 3000,
            heartbeat_interval: 30000,
            connect_timeout: 10000,
            channel_capacity: 64,
        }
    }
}

enum SessionEnd {
    Normal,
    Abnormal(String),
}

struct Shared {
    state: RwLock<ConnectionState>,
    state_change: broadcast::Sender<ConnectionState>,
    scans: broadcast::Sender<MealScan>,
    messages: broadcast::Sender<ServerMessage>,
    socket: RwLock<Option<mpsc::Sender<Message>>>,
    is_manually_closed: AtomicBool,
    connection_attempts: AtomicU32,
    event_id: RwLock<Option<i64>>,
}

impl Shared {
    async fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.write().await;
        if *current != state {
            tracing::info!(from = ?*current, to = ?state, "meal updates state change");
            *current = state;
            // No receivers is fine
            let _ = self.state_change.send(state);
        }
    }

    async fn open(&self, url: &Url, options: &MealUpdatesOptions) -> Result<WsStream, RealtimeError> {
        let attempt = self.connection_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Opening {} (attempt {})", url, attempt);
        let limit = Duration::from_millis(options.connect_timeout);
        match timeout(limit, connect_async(url.as_str())).await {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(e)) => Err(RealtimeError::WebSocketError(e)),
            Err(_) => Err(RealtimeError::ConnectionError(format!(
                "Handshake timed out after {}ms",
                options.connect_timeout
            ))),
        }
    }

    /// Start the writer task, join the event room and mark the connection live
    async fn attach(
        &self,
        stream: WsStream,
        event_id: i64,
        options: &MealUpdatesOptions,
    ) -> Result<WsReader, RealtimeError> {
        let (mut write, read) = stream.split();
        let (socket_tx, mut socket_rx) = mpsc::channel::<Message>(options.channel_capacity);

        tokio::spawn(async move {
            while let Some(message) = socket_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                trace!("Writer task sending {:?}", message);
                if let Err(e) = write.send(message).await {
                    debug!("Writer task: WebSocket send error: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = write.close().await;
            debug!("Writer task finished");
        });

        let join = ClientMessage::JoinRoom {
            event_id,
            client_type: options.client_type,
        };
        socket_tx
            .send(Message::Text(serde_json::to_string(&join)?))
            .await
            .map_err(|e| RealtimeError::ConnectionError(format!("Failed to join room: {}", e)))?;

        *self.socket.write().await = Some(socket_tx);
        self.set_state(ConnectionState::Connected).await;
        Ok(read)
    }

    async fn read_until_closed(&self, read: &mut WsReader, options: &MealUpdatesOptions) -> SessionEnd {
        let mut heartbeat = interval(Duration::from_millis(options.heartbeat_interval.max(1)));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => self.dispatch(&text),
                    Some(Ok(Message::Close(frame))) => {
                        return match frame {
                            Some(frame) if frame.code == CloseCode::Normal => SessionEnd::Normal,
                            Some(frame) => SessionEnd::Abnormal(format!("closed with code {}", frame.code)),
                            None => SessionEnd::Abnormal("closed without status".to_string()),
                        };
                    }
                    Some(Ok(other)) => trace!("Ignoring non-text frame: {:?}", other),
                    Some(Err(e)) => return SessionEnd::Abnormal(e.to_string()),
                    None => return SessionEnd::Abnormal("stream ended".to_string()),
                },
                _ = heartbeat.tick() => {
                    let sender = self.socket.read().await.as_ref().cloned();
                    let Some(sender) = sender else {
                        return SessionEnd::Abnormal("socket sender gone".to_string());
                    };
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        return SessionEnd::Abnormal("writer task gone".to_string());
                    }
                }
            }
        }
    }

    fn dispatch(&self, text: &str) {
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Dropping unrecognised message ({}): {}", e, text);
                return;
            }
        };

        match &message {
            ServerMessage::Connected { message, .. } => {
                debug!("Server greeting: {}", message.as_deref().unwrap_or_default())
            }
            ServerMessage::RoomJoinSuccess { event_id, .. } => {
                tracing::info!(?event_id, "joined meal updates room")
            }
            ServerMessage::MealScanned(scan) => {
                let _ = self.scans.send(scan.clone());
            }
            ServerMessage::Error { message } => warn!("Server reported an error: {}", message),
        }
        let _ = self.messages.send(message);
    }

    /// Retry with a fixed delay; `None` once the ceiling is hit or the client was closed
    async fn reconnect(&self, url: &Url, event_id: i64, options: &MealUpdatesOptions) -> Option<WsReader> {
        let mut failures = 0;
        while failures < options.max_reconnect_attempts {
            self.set_state(ConnectionState::Reconnecting).await;
            sleep(Duration::from_millis(options.reconnect_interval)).await;
            if self.is_manually_closed.load(Ordering::SeqCst) {
                return None;
            }

            let attempt = match self.open(url, options).await {
                Ok(stream) => self.attach(stream, event_id, options).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(read) => {
                    tracing::info!(failures, "meal updates reconnected");
                    return Some(read);
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        "Reconnect attempt {} of {} failed: {}",
                        failures, options.max_reconnect_attempts, e
                    );
                }
            }
        }

        error!(
            "Giving up on meal updates after {} failed reconnect attempts",
            options.max_reconnect_attempts
        );
        self.set_state(ConnectionState::Disconnected).await;
        None
    }
}

async fn supervise(
    shared: Arc<Shared>,
    url: Url,
    event_id: i64,
    options: MealUpdatesOptions,
    mut read: WsReader,
) {
    loop {
        let end = shared.read_until_closed(&mut read, &options).await;
        shared.socket.write().await.take();

        if shared.is_manually_closed.load(Ordering::SeqCst) {
            return;
        }
        match end {
            SessionEnd::Normal => {
                tracing::info!("meal updates closed by server");
                shared.set_state(ConnectionState::Disconnected).await;
                return;
            }
            SessionEnd::Abnormal(reason) => warn!("Meal updates connection lost: {}", reason),
        }
        if !options.auto_reconnect {
            shared.set_state(ConnectionState::Disconnected).await;
            return;
        }

        match shared.reconnect(&url, event_id, &options).await {
            Some(next) => read = next,
            None => return,
        }
    }
}

/// Live meal-count feed for one event.
///
/// Owned by whoever needs it and closed with [`MealUpdatesClient::disconnect`]
/// or on drop. Scans published by any station in the event room are fanned
/// out to every [`MealUpdatesClient::subscribe`] receiver.
pub struct MealUpdatesClient {
    url: String,
    options: MealUpdatesOptions,
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl MealUpdatesClient {
    pub fn new(url: &str) -> Self {
        Self::new_with_options(url, MealUpdatesOptions::default())
    }

    pub fn new_with_options(url: &str, options: MealUpdatesOptions) -> Self {
        let (state_change, _) = broadcast::channel(16);
        let (scans, _) = broadcast::channel(options.channel_capacity);
        let (messages, _) = broadcast::channel(options.channel_capacity);
        Self {
            url: url.to_string(),
            options,
            shared: Arc::new(Shared {
                state: RwLock::new(ConnectionState::Disconnected),
                state_change,
                scans,
                messages,
                socket: RwLock::new(None),
                is_manually_closed: AtomicBool::new(false),
                connection_attempts: AtomicU32::new(0),
                event_id: RwLock::new(None),
            }),
            supervisor: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &MealUpdatesOptions {
        &self.options
    }

    /// Meal scans broadcast in the joined room
    pub fn subscribe(&self) -> broadcast::Receiver<MealScan> {
        self.shared.scans.subscribe()
    }

    /// Every parsed server message
    pub fn subscribe_messages(&self) -> broadcast::Receiver<ServerMessage> {
        self.shared.messages.subscribe()
    }

    pub fn on_state_change(&self) -> broadcast::Receiver<ConnectionState> {
        self.shared.state_change.subscribe()
    }

    pub async fn get_connection_state(&self) -> ConnectionState {
        *self.shared.state.read().await
    }

    /// Connection attempts since the last [`connect`](Self::connect), the first included
    pub fn connection_attempts(&self) -> u32 {
        self.shared.connection_attempts.load(Ordering::SeqCst)
    }

    pub async fn event_id(&self) -> Option<i64> {
        *self.shared.event_id.read().await
    }

    fn room_url(&self, event_id: i64) -> Result<Url, RealtimeError> {
        let mut url = Url::parse(&self.url)?;
        match url.scheme() {
            "ws" | "wss" => {}
            s => {
                return Err(RealtimeError::ConnectionError(format!(
                    "Unsupported URL scheme: {}",
                    s
                )))
            }
        }
        url.query_pairs_mut()
            .append_pair("event_id", &event_id.to_string());
        Ok(url)
    }

    /// Open the feed for `event_id` and join its room.
    ///
    /// The first handshake failure is returned to the caller; later drops are
    /// retried in the background.
    pub async fn connect(&self, event_id: i64) -> Result<(), RealtimeError> {
        let mut supervisor = self.supervisor.lock().await;
        if let Some(handle) = supervisor.as_ref() {
            if !handle.is_finished() {
                let current = self.shared.event_id.read().await.unwrap_or(event_id);
                return Err(RealtimeError::AlreadyConnected(current));
            }
        }

        let url = self.room_url(event_id)?;
        self.shared.is_manually_closed.store(false, Ordering::SeqCst);
        self.shared.connection_attempts.store(0, Ordering::SeqCst);
        *self.shared.event_id.write().await = Some(event_id);
        self.shared.set_state(ConnectionState::Connecting).await;

        let opened = match self.shared.open(&url, &self.options).await {
            Ok(stream) => self.shared.attach(stream, event_id, &self.options).await,
            Err(e) => Err(e),
        };
        let read = match opened {
            Ok(read) => read,
            Err(e) => {
                error!("Meal updates connection failed: {}", e);
                self.shared.set_state(ConnectionState::Disconnected).await;
                return Err(e);
            }
        };

        let span = tracing::info_span!("meal_updates", event_id);
        let task = supervise(
            self.shared.clone(),
            url,
            event_id,
            self.options.clone(),
            read,
        );
        *supervisor = Some(tokio::spawn(task.instrument(span)));
        Ok(())
    }

    /// Broadcast a scan to the room
    pub async fn publish_meal_scan(&self, meal_type: &str, new_count: u64) -> Result<(), RealtimeError> {
        self.send(&ClientMessage::meal_scanned(meal_type, new_count)).await
    }

    pub async fn send(&self, message: &ClientMessage) -> Result<(), RealtimeError> {
        let sender = self.shared.socket.read().await.as_ref().cloned();
        let Some(sender) = sender else {
            warn!("Cannot send message, meal updates socket unavailable");
            return Err(RealtimeError::ConnectionError("Not connected".to_string()));
        };
        let text = serde_json::to_string(message)?;
        sender.send(Message::Text(text)).await.map_err(|e| {
            RealtimeError::ConnectionError(format!("Failed to send message to socket task: {}", e))
        })
    }

    /// Close the feed and stop reconnecting
    pub async fn disconnect(&self) -> Result<(), RealtimeError> {
        self.shared.is_manually_closed.store(true, Ordering::SeqCst);

        if let Some(handle) = self.supervisor.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }

        if let Some(sender) = self.shared.socket.write().await.take() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnect".into(),
            };
            if sender.send(Message::Close(Some(frame))).await.is_err() {
                debug!("Writer task already gone");
            }
        }

        *self.shared.event_id.write().await = None;
        self.shared.set_state(ConnectionState::Disconnected).await;
        Ok(())
    }
}

impl Drop for MealUpdatesClient {
    fn drop(&mut self) {
        self.shared.is_manually_closed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.supervisor.get_mut().take() {
            handle.abort();
        }
    }
}

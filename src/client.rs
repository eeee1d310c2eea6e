//! Async client for the Together session protocol.
//!
//! [`TogetherClient`] owns the whole connection lifecycle: candidate-URL
//! dialing with ws↔wss fallback, the `client_hello`→`server_welcome`
//! handshake, a single background session loop per connection, and the
//! command surface for playback control, track adds, and heartbeats.
//!
//! State is observable through a [`watch`] channel, events through a bounded
//! [`broadcast`] channel. Every connection that outlives its handshake ends
//! with exactly one [`TogetherEvent::Disconnected`] and a state of
//! [`ConnectionState::Idle`], whatever caused the exit.
//!
//! # Example
//!
//! ```rust,ignore
//! let client = TogetherClient::new(ClientConfig::new());
//! let mut events = client.events();
//!
//! client.connect(join_info, "Alice").await;
//!
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         TogetherEvent::Welcome(welcome) => { /* … */ }
//!         TogetherEvent::Disconnected => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::clock::monotonic_ms;
use crate::error::TogetherError;
use crate::event::TogetherEvent;
use crate::link::{candidate_urls, JoinInfo};
use crate::protocol::{
    AddTrackMode, AddTrackRequest, ClientHello, ClientLeave, ControlAction, ControlRequest,
    HeartbeatPing, Track, TogetherMessage, PROTOCOL_VERSION,
};
use crate::state::ConnectionState;
use crate::transport::{Connector, Transport};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default timeout for the graceful disconnect.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Maximum length of a client identity after trimming.
const CLIENT_ID_MAX_LEN: usize = 64;

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`TogetherClient`].
///
/// All fields have sensible defaults; a bare `ClientConfig::new()` yields a
/// client with a generated identity.
///
/// # Example
///
/// ```
/// use together_client::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new()
///     .with_package_name("com.example.player")
///     .with_event_channel_capacity(128)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Stable identity for this client instance across reconnect attempts.
    /// Trimmed and capped at 64 characters; blank or absent values are
    /// replaced by a generated UUID.
    pub client_id: Option<String>,
    /// Optional package identifier sent in the handshake.
    pub package_name: Option<String>,
    /// Capacity of the bounded event channel.
    ///
    /// Subscribers that cannot keep up lose events (with a warning logged)
    /// instead of blocking protocol processing. Defaults to **64**; values
    /// below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`TogetherClient::disconnect`] waits for the session loop to
    /// close gracefully before aborting it. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            package_name: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply a caller-managed client identity.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the package identifier sent in the handshake.
    #[must_use]
    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }

    /// Set the capacity of the bounded event channel.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the graceful-disconnect timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Trim, default, and cap a client identity.
fn normalize_client_id(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or("");
    let id = if trimmed.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        trimmed.to_string()
    };
    id.chars().take(CLIENT_ID_MAX_LEN).collect()
}

// ── Shared state ────────────────────────────────────────────────────

/// The target the session loop flips the state to after a handshake.
enum ConnectTarget {
    Local(JoinInfo),
    Remote { session_id: String },
}

/// One live (or pending) connection attempt.
struct ActiveConnection {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// State shared between the client handle and the session loop task.
struct ClientShared {
    connector: Arc<dyn Connector>,
    client_id: String,
    package_name: Option<String>,
    shutdown_timeout: Duration,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<TogetherEvent>,
    /// Set only after a `server_welcome` naming this client; cleared on every
    /// disconnect. Gates outbound control/track commands.
    self_participant_id: StdMutex<Option<String>>,
    /// Outbound message queue into the current session loop, if any.
    cmd_tx: StdMutex<Option<mpsc::UnboundedSender<TogetherMessage>>>,
    /// The single owned connection attempt; also serializes connect/disconnect.
    conn: Mutex<Option<ActiveConnection>>,
}

impl ClientShared {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: TogetherEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("no event subscribers, event dropped");
        }
    }

    fn self_pid(&self) -> Option<String> {
        self.self_participant_id
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    fn set_self_pid(&self, pid: Option<String>) {
        if let Ok(mut guard) = self.self_participant_id.lock() {
            *guard = pid;
        }
    }

    fn set_cmd_tx(&self, sender: Option<mpsc::UnboundedSender<TogetherMessage>>) {
        if let Ok(mut guard) = self.cmd_tx.lock() {
            *guard = sender;
        }
    }

    fn queue(&self, message: TogetherMessage) {
        let sender = self.cmd_tx.lock().ok().and_then(|guard| guard.clone());
        match sender {
            // Send failures mean the loop is gone; teardown will reset state.
            Some(sender) => {
                let _ = sender.send(message);
            }
            None => debug!("no active session, outbound message dropped"),
        }
    }
}

/// Guarantees the terminal transition of a successful connection: exactly one
/// `Disconnected` event and a reset to `Idle`, on every exit path of the
/// session loop — graceful close, fatal error, kick/ban, and external
/// cancellation (dropping the loop future runs this destructor).
struct TerminalGuard {
    shared: Arc<ClientShared>,
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.shared.set_cmd_tx(None);
        self.shared.set_self_pid(None);
        self.shared.emit(TogetherEvent::Disconnected);
        self.shared.set_state(ConnectionState::Idle);
        debug!("session loop terminated");
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client for one Together session connection at a time.
///
/// All failure paths surface as [`TogetherEvent`]s (or silent no-ops for
/// commands without an established identity); nothing propagates as a fault
/// to the caller, and the client never retries on its own.
pub struct TogetherClient {
    shared: Arc<ClientShared>,
}

impl TogetherClient {
    /// Create a client that dials real WebSocket endpoints.
    #[cfg(feature = "transport-websocket")]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, crate::transports::WebSocketConnector::default())
    }

    /// Create a client over a custom [`Connector`] (custom transports, tests).
    pub fn with_connector(config: ClientConfig, connector: impl Connector) -> Self {
        let (state_tx, _state_rx) = watch::channel(ConnectionState::Idle);
        let (events_tx, _events_rx) =
            broadcast::channel(config.event_channel_capacity.max(1));

        Self {
            shared: Arc::new(ClientShared {
                connector: Arc::new(connector),
                client_id: normalize_client_id(config.client_id.as_deref()),
                package_name: config.package_name,
                shutdown_timeout: config.shutdown_timeout,
                state_tx,
                events_tx,
                self_participant_id: StdMutex::new(None),
                cmd_tx: StdMutex::new(None),
                conn: Mutex::new(None),
            }),
        }
    }

    // ── Observables ─────────────────────────────────────────────────

    /// Subscribe to the event stream.
    ///
    /// Multi-subscriber, bounded, drop-on-overflow: a lagging subscriber
    /// receives [`RecvError::Lagged`](broadcast::error::RecvError::Lagged)
    /// and continues from the oldest retained event.
    pub fn events(&self) -> broadcast::Receiver<TogetherEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Watch the connection state; readers always see the latest value.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// The current connection state.
    pub fn current_state(&self) -> ConnectionState {
        self.shared.state_tx.borrow().clone()
    }

    /// This client's participant id, once a `server_welcome` has named it.
    pub fn self_participant_id(&self) -> Option<String> {
        self.shared.self_pid()
    }

    /// The process-lifetime client identity sent in every handshake.
    pub fn client_id(&self) -> &str {
        &self.shared.client_id
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Begin joining a locally-hosted session.
    ///
    /// Any active connection is fully disconnected (awaited) first. The state
    /// moves to [`Connecting`](ConnectionState::Connecting) before any I/O;
    /// the handshake and receive loop run on a single background task. If
    /// every candidate endpoint fails, one [`TogetherEvent::Error`] is
    /// emitted and the state returns to Idle — retry is the caller's call.
    pub async fn connect(&self, join_info: JoinInfo, display_name: &str) {
        let mut conn = self.shared.conn.lock().await;
        teardown(&self.shared, conn.take()).await;

        let candidates = candidate_urls(&join_info.ws_url());
        let hello = ClientHello {
            protocol_version: PROTOCOL_VERSION,
            session_id: join_info.session_id.clone(),
            session_key: join_info.session_key.clone(),
            client_id: self.shared.client_id.clone(),
            display_name: display_name.trim().to_string(),
            package_name: self.shared.package_name.clone(),
        };
        self.shared
            .set_state(ConnectionState::Connecting(join_info.clone()));

        *conn = Some(self.spawn_session(candidates, hello, ConnectTarget::Local(join_info)));
    }

    /// Begin joining a session at a manually-specified remote endpoint.
    ///
    /// Same contract as [`connect`](Self::connect); the state moves through
    /// [`ConnectingRemote`](ConnectionState::ConnectingRemote) instead, and a
    /// blank display name defaults to `"Guest"`.
    pub async fn connect_remote(
        &self,
        ws_url: &str,
        session_id: &str,
        session_key: &str,
        display_name: &str,
    ) {
        let mut conn = self.shared.conn.lock().await;
        teardown(&self.shared, conn.take()).await;

        let ws_url = ws_url.trim().to_string();
        let candidates = candidate_urls(&ws_url);
        let display_name = {
            let trimmed = display_name.trim();
            if trimmed.is_empty() { "Guest" } else { trimmed }
        };
        let hello = ClientHello {
            protocol_version: PROTOCOL_VERSION,
            session_id: session_id.to_string(),
            session_key: session_key.to_string(),
            client_id: self.shared.client_id.clone(),
            display_name: display_name.to_string(),
            package_name: self.shared.package_name.clone(),
        };
        self.shared.set_state(ConnectionState::ConnectingRemote {
            ws_url,
            session_id: session_id.to_string(),
        });

        *conn = Some(self.spawn_session(
            candidates,
            hello,
            ConnectTarget::Remote {
                session_id: session_id.to_string(),
            },
        ));
    }

    /// Terminate any active or pending connection. Idempotent.
    ///
    /// Cancels the session loop and awaits its termination (aborting after
    /// the configured shutdown timeout), attempts a best-effort graceful
    /// close of the transport, clears the participant identity, and resets
    /// the state to Idle. Calling this from Idle is a no-op.
    pub async fn disconnect(&self) {
        let mut conn = self.shared.conn.lock().await;
        teardown(&self.shared, conn.take()).await;
    }

    // ── Command surface ─────────────────────────────────────────────

    /// Request a playback-control action.
    ///
    /// Silent no-op until a `server_welcome` has established this client's
    /// participant identity. Fire-and-forget: no acknowledgement is awaited.
    pub fn request_control(&self, session_id: &str, action: ControlAction) {
        let Some(participant_id) = self.shared.self_pid() else {
            debug!("request_control ignored: no participant identity yet");
            return;
        };
        self.shared
            .queue(TogetherMessage::ControlRequest(ControlRequest {
                session_id: session_id.to_string(),
                participant_id,
                action,
            }));
    }

    /// Request adding a track to the shared queue.
    ///
    /// Same identity gating and fire-and-forget semantics as
    /// [`request_control`](Self::request_control).
    pub fn request_add_track(&self, session_id: &str, track: Track, mode: AddTrackMode) {
        let Some(participant_id) = self.shared.self_pid() else {
            debug!("request_add_track ignored: no participant identity yet");
            return;
        };
        self.shared
            .queue(TogetherMessage::AddTrackRequest(AddTrackRequest {
                session_id: session_id.to_string(),
                participant_id,
                track,
                mode,
            }));
    }

    /// Send a heartbeat ping for clock correlation.
    ///
    /// Always attempted, participant identity or not (a ping may precede the
    /// welcome in pathological orderings). Send failures are swallowed; the
    /// caller detects heartbeat loss by timeout.
    pub fn send_heartbeat(&self, session_id: &str, ping_id: i64, client_elapsed_realtime_ms: i64) {
        self.shared
            .queue(TogetherMessage::HeartbeatPing(HeartbeatPing {
                session_id: session_id.to_string(),
                ping_id,
                client_elapsed_realtime_ms,
            }));
    }

    // ── Internals ───────────────────────────────────────────────────

    fn spawn_session(
        &self,
        candidates: Vec<String>,
        hello: ClientHello,
        target: ConnectTarget,
    ) -> ActiveConnection {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<TogetherMessage>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shared.set_cmd_tx(Some(cmd_tx));

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(run_session(shared, candidates, hello, target, cmd_rx, shutdown_rx));

        ActiveConnection { shutdown_tx, task }
    }
}

impl std::fmt::Debug for TogetherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TogetherClient")
            .field("state", &*self.shared.state_tx.borrow())
            .field("client_id", &self.shared.client_id)
            .field("has_participant_id", &self.shared.self_pid().is_some())
            .finish()
    }
}

impl Drop for TogetherClient {
    fn drop(&mut self) {
        // `Drop` is synchronous, so a graceful close cannot be awaited here.
        // Aborting the task drops the loop future, whose terminal guard still
        // emits `Disconnected` and resets the state.
        if let Ok(mut conn) = self.shared.conn.try_lock() {
            if let Some(active) = conn.take() {
                active.task.abort();
            }
        }
    }
}

/// Stop the given connection (if any) and reset shared session state.
///
/// Sends the graceful-shutdown signal, awaits the loop with the configured
/// timeout, and aborts it on expiry so the task can never detach.
async fn teardown(shared: &Arc<ClientShared>, conn: Option<ActiveConnection>) {
    if let Some(ActiveConnection { shutdown_tx, task }) = conn {
        let _ = shutdown_tx.send(());
        let mut task = task;
        match tokio::time::timeout(shared.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                warn!("session loop terminated with join error: {join_err}");
            }
            Err(_) => {
                warn!("session loop did not exit within timeout; aborting task");
                task.abort();
                if let Err(join_err) = task.await {
                    debug!("session loop aborted: {join_err}");
                }
            }
        }
    }
    shared.set_cmd_tx(None);
    shared.set_self_pid(None);
    shared.set_state(ConnectionState::Idle);
}

// ── Session loop ────────────────────────────────────────────────────

/// One connection attempt end to end: dial candidates in order, handshake,
/// then run the receive loop until something terminal happens.
async fn run_session(
    shared: Arc<ClientShared>,
    candidates: Vec<String>,
    hello: ClientHello,
    target: ConnectTarget,
    cmd_rx: mpsc::UnboundedReceiver<TogetherMessage>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let session_id = hello.session_id.clone();

    let mut last_err: Option<TogetherError> = None;
    let mut established: Option<(Box<dyn Transport>, String)> = None;
    for url in &candidates {
        tokio::select! {
            // Disconnect during dialing: no connection was established, so
            // there is no terminal Disconnected to emit — just go Idle.
            _ = &mut shutdown_rx => {
                shared.set_state(ConnectionState::Idle);
                return;
            }
            result = dial_and_hello(shared.connector.as_ref(), url, &hello) => match result {
                Ok(transport) => {
                    established = Some((transport, url.clone()));
                    break;
                }
                Err(e) => {
                    warn!(url = %url, "candidate failed: {e}");
                    last_err = Some(e);
                }
            }
        }
    }

    let Some((transport, url)) = established else {
        let message = connection_failure_message(last_err.as_ref());
        shared.emit(TogetherEvent::Error {
            message,
            cause: last_err.map(Arc::new),
        });
        shared.set_state(ConnectionState::Idle);
        return;
    };

    match target {
        ConnectTarget::Local(join_info) => {
            shared.set_state(ConnectionState::Connected(join_info));
        }
        ConnectTarget::Remote { session_id } => {
            shared.set_state(ConnectionState::ConnectedRemote {
                ws_url: url,
                session_id,
            });
        }
    }

    // From here on the terminal transition is guaranteed, even if this task
    // is aborted mid-await.
    let _guard = TerminalGuard {
        shared: Arc::clone(&shared),
    };
    receive_loop(&shared, transport, &session_id, cmd_rx, shutdown_rx).await;
}

/// Dial one candidate and send the handshake hello. A hello that cannot be
/// sent counts as a failed candidate; the transport is closed best-effort.
async fn dial_and_hello(
    connector: &dyn Connector,
    url: &str,
    hello: &ClientHello,
) -> Result<Box<dyn Transport>, TogetherError> {
    let mut transport = connector.connect(url).await?;
    let frame = serde_json::to_string(&TogetherMessage::ClientHello(hello.clone()))?;
    if let Err(e) = transport.send(frame).await {
        let _ = transport.close().await;
        return Err(e);
    }
    Ok(transport)
}

/// The receive/dispatch loop for one live connection.
///
/// Single cooperative task, no parallel readers: inbound frames are processed
/// strictly in arrival order. Exits on graceful shutdown, peer close, a fatal
/// transport error, or a membership-terminating message.
async fn receive_loop(
    shared: &Arc<ClientShared>,
    mut transport: Box<dyn Transport>,
    session_id: &str,
    mut cmd_rx: mpsc::UnboundedReceiver<TogetherMessage>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!(session_id, "session loop started");

    loop {
        tokio::select! {
            // Outbound command from the client handle.
            cmd = cmd_rx.recv() => match cmd {
                Some(message) => match serde_json::to_string(&message) {
                    Ok(frame) => {
                        if let Err(e) = transport.send(frame).await {
                            error!("transport send error: {e}");
                            shared.emit(TogetherEvent::Error {
                                message: "Connection loop failed".into(),
                                cause: Some(Arc::new(e)),
                            });
                            break;
                        }
                    }
                    Err(e) => {
                        // A message we built ourselves failing to serialize is
                        // a programming bug; don't kill the loop over it.
                        error!("failed to serialize outbound message: {e}");
                    }
                },
                // Command sender cleared — teardown in progress.
                None => {
                    let _ = transport.close().await;
                    break;
                }
            },

            // Graceful shutdown from disconnect().
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                if let Some(participant_id) = shared.self_pid() {
                    let leave = TogetherMessage::ClientLeave(ClientLeave {
                        session_id: session_id.to_string(),
                        participant_id,
                    });
                    if let Ok(frame) = serde_json::to_string(&leave) {
                        let _ = transport.send(frame).await;
                    }
                }
                let _ = transport.close().await;
                break;
            }

            // Inbound frame from the server.
            incoming = transport.recv() => match incoming {
                Some(Ok(text)) => match serde_json::from_str::<TogetherMessage>(&text) {
                    Ok(message) => {
                        if dispatch(shared, session_id, message) == ControlFlow::Break(()) {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("failed to decode frame: {e}");
                        shared.emit(TogetherEvent::Error {
                            message: "Failed to decode message".into(),
                            cause: Some(Arc::new(e.into())),
                        });
                    }
                },
                Some(Err(e)) => {
                    error!("transport receive error: {e}");
                    shared.emit(TogetherEvent::Error {
                        message: "Connection loop failed".into(),
                        cause: Some(Arc::new(e)),
                    });
                    break;
                }
                // Peer closed the connection cleanly.
                None => {
                    debug!("connection closed by server");
                    break;
                }
            },
        }
    }
}

/// Dispatch one decoded message. Everything is filtered by session id and,
/// where applicable, by this client's participant id; frames for other
/// sessions or participants drop silently. Unhandled variants are a
/// forward-compatible no-op.
fn dispatch(
    shared: &ClientShared,
    session_id: &str,
    message: TogetherMessage,
) -> ControlFlow<()> {
    match message {
        TogetherMessage::ServerWelcome(welcome) => {
            if welcome.session_id == session_id {
                if welcome.protocol_version != PROTOCOL_VERSION {
                    shared.emit(TogetherEvent::ServerIssue {
                        message: format!(
                            "Server speaks protocol version {}, client speaks {}",
                            welcome.protocol_version, PROTOCOL_VERSION
                        ),
                        code: Some("protocol_version_mismatch".into()),
                    });
                }
                shared.set_self_pid(Some(welcome.participant_id.clone()));
                shared.emit(TogetherEvent::Welcome(welcome));
            }
        }
        TogetherMessage::RoomState(room_state) => {
            if room_state.state.session_id == session_id {
                shared.emit(TogetherEvent::RoomState(room_state.state));
            }
        }
        TogetherMessage::JoinDecision(decision) => {
            if decision.session_id == session_id
                && shared.self_pid().as_deref() == Some(decision.participant_id.as_str())
            {
                shared.emit(TogetherEvent::JoinDecision(decision));
            }
        }
        TogetherMessage::Kick(kick) => {
            if kick.session_id == session_id
                && shared.self_pid().as_deref() == Some(kick.participant_id.as_str())
            {
                shared.emit(TogetherEvent::Error {
                    message: termination_reason(kick.reason.as_deref(), "Kicked"),
                    cause: None,
                });
                return ControlFlow::Break(());
            }
        }
        TogetherMessage::Ban(ban) => {
            if ban.session_id == session_id
                && shared.self_pid().as_deref() == Some(ban.participant_id.as_str())
            {
                shared.emit(TogetherEvent::Error {
                    message: termination_reason(ban.reason.as_deref(), "Banned"),
                    cause: None,
                });
                return ControlFlow::Break(());
            }
        }
        TogetherMessage::HeartbeatPong(pong) => {
            if pong.session_id == session_id {
                shared.emit(TogetherEvent::HeartbeatPong {
                    pong,
                    received_at_monotonic_ms: monotonic_ms(),
                });
            }
        }
        TogetherMessage::ServerError(server_error) => {
            shared.emit(TogetherEvent::ServerIssue {
                message: server_error.message,
                code: server_error.code,
            });
        }
        // Client-originated and broadcast-only variants carry nothing for us;
        // room membership changes arrive through RoomState snapshots.
        TogetherMessage::ClientHello(_)
        | TogetherMessage::ControlRequest(_)
        | TogetherMessage::AddTrackRequest(_)
        | TogetherMessage::JoinRequest(_)
        | TogetherMessage::ParticipantJoined(_)
        | TogetherMessage::ParticipantLeft(_)
        | TogetherMessage::HeartbeatPing(_)
        | TogetherMessage::ClientLeave(_) => {}
    }
    ControlFlow::Continue(())
}

/// Server-supplied termination reason, or the default when blank/absent.
fn termination_reason(reason: Option<&str>, default: &str) -> String {
    match reason.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => default.to_string(),
    }
}

// ── Connection failure classification ───────────────────────────────

/// Walk the error's cause chain to its root.
fn root_cause<'a>(err: &'a (dyn std::error::Error + 'static)) -> &'a (dyn std::error::Error + 'static) {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current
}

fn classify_io(err: &std::io::Error) -> Option<&'static str> {
    use std::io::ErrorKind;
    // DNS failures surface as uncategorized I/O errors; sniff the message.
    let message = err.to_string().to_ascii_lowercase();
    if err.kind() == ErrorKind::NotFound
        || message.contains("failed to lookup address")
        || message.contains("name or service not known")
        || message.contains("no such host")
        || message.contains("nodename nor servname")
    {
        return Some("Server not found");
    }
    match err.kind() {
        ErrorKind::ConnectionRefused => Some("Connection refused"),
        ErrorKind::TimedOut => Some("Connection timed out"),
        _ => None,
    }
}

fn classify_failure(err: &TogetherError) -> Option<&'static str> {
    match err {
        TogetherError::Timeout => Some("Connection timed out"),
        TogetherError::Tls(_) => Some("Secure connection failed"),
        TogetherError::InvalidUrl(_) => Some("Invalid server websocket URL"),
        _ => root_cause(err)
            .downcast_ref::<std::io::Error>()
            .and_then(classify_io),
    }
}

/// The single human-readable message emitted when every candidate endpoint
/// has failed, derived from the last failure's root cause.
fn connection_failure_message(err: Option<&TogetherError>) -> String {
    let Some(err) = err else {
        return "Connection failed".to_string();
    };
    if let Some(reason) = classify_failure(err) {
        return format!("Connection failed: {reason}");
    }
    let raw = root_cause(err).to_string();
    let raw = raw.trim();
    if raw.is_empty() {
        "Connection failed".to_string()
    } else {
        format!("Connection failed: {raw}")
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ClientConfig::new();
        assert!(config.client_id.is_none());
        assert!(config.package_name.is_none());
        assert_eq!(config.event_channel_capacity, 64);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn config_builder_methods() {
        let config = ClientConfig::new()
            .with_client_id("cid")
            .with_package_name("com.example")
            .with_event_channel_capacity(128)
            .with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(config.client_id.as_deref(), Some("cid"));
        assert_eq!(config.package_name.as_deref(), Some("com.example"));
        assert_eq!(config.event_channel_capacity, 128);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config = ClientConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn client_id_is_trimmed_and_capped() {
        assert_eq!(normalize_client_id(Some("  abc  ")), "abc");

        let long = "x".repeat(200);
        let normalized = normalize_client_id(Some(&long));
        assert_eq!(normalized.chars().count(), 64);
    }

    #[test]
    fn blank_client_id_gets_generated() {
        let generated = normalize_client_id(Some("   "));
        assert!(!generated.is_empty());
        // Looks like a UUID, not whitespace.
        assert!(uuid::Uuid::parse_str(&generated).is_ok());

        let also_generated = normalize_client_id(None);
        assert!(uuid::Uuid::parse_str(&also_generated).is_ok());
    }

    #[test]
    fn termination_reason_prefers_server_detail() {
        assert_eq!(termination_reason(Some("be nice"), "Kicked"), "be nice");
        assert_eq!(termination_reason(Some("   "), "Kicked"), "Kicked");
        assert_eq!(termination_reason(None, "Banned"), "Banned");
    }

    #[test]
    fn classify_connection_refused() {
        let err = TogetherError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert_eq!(
            connection_failure_message(Some(&err)),
            "Connection failed: Connection refused"
        );
    }

    #[test]
    fn classify_timeouts_from_both_layers() {
        assert_eq!(
            connection_failure_message(Some(&TogetherError::Timeout)),
            "Connection failed: Connection timed out"
        );
        let io = TogetherError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "slow",
        ));
        assert_eq!(
            connection_failure_message(Some(&io)),
            "Connection failed: Connection timed out"
        );
    }

    #[test]
    fn classify_dns_failure_by_message() {
        let err = TogetherError::Io(std::io::Error::other(
            "failed to lookup address information: Name or service not known",
        ));
        assert_eq!(
            connection_failure_message(Some(&err)),
            "Connection failed: Server not found"
        );
    }

    #[test]
    fn classify_tls_and_url_failures() {
        let tls = TogetherError::Tls("handshake alert".into());
        assert_eq!(
            connection_failure_message(Some(&tls)),
            "Connection failed: Secure connection failed"
        );
        let url = TogetherError::InvalidUrl("unsupported scheme".into());
        assert_eq!(
            connection_failure_message(Some(&url)),
            "Connection failed: Invalid server websocket URL"
        );
    }

    #[test]
    fn unclassified_failure_falls_back_to_root_message() {
        let err = TogetherError::TransportSend("pipe burst".into());
        assert_eq!(
            connection_failure_message(Some(&err)),
            "Connection failed: transport send error: pipe burst"
        );
    }

    #[test]
    fn no_failure_detail_yields_generic_message() {
        assert_eq!(connection_failure_message(None), "Connection failed");
    }
}

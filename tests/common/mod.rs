#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Together Client integration tests.
//!
//! Provides a scripted [`MockTransport`], a [`MockConnector`] that hands out
//! scripted dial outcomes per candidate URL, and helper functions for
//! constructing common server message JSON strings.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use together_client::protocol::{
    BanParticipant, HeartbeatPong, JoinDecision, KickParticipant, Participant, RoomSettings,
    RoomState, RoomStateMessage, ServerError, ServerRole, ServerWelcome, Track, TogetherMessage,
    PROTOCOL_VERSION,
};
use together_client::{Connector, TogetherError, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// A scripted mock transport for integration testing.
///
/// Scripted server responses are consumed in order by `recv()`; once the
/// script runs out, `recv()` hangs so the session loop stays alive until
/// shutdown. All messages sent by the client are recorded in `sent`.
pub struct MockTransport {
    incoming: VecDeque<Option<Result<String, TogetherError>>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a mock transport with the given scripted incoming messages.
    ///
    /// Returns the transport plus shared handles for inspecting sent messages
    /// and whether close was called.
    pub fn new(
        incoming: Vec<Option<Result<String, TogetherError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), TogetherError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TogetherError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // No more scripted messages — hang forever so the session loop
            // stays alive until shutdown is called.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), TogetherError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// A transport whose `send` always fails. For hello-send-failure scripts.
pub struct BrokenSendTransport {
    pub closed: Arc<AtomicBool>,
}

impl BrokenSendTransport {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        (
            Self {
                closed: Arc::clone(&closed),
            },
            closed,
        )
    }
}

#[async_trait]
impl Transport for BrokenSendTransport {
    async fn send(&mut self, _message: String) -> Result<(), TogetherError> {
        Err(TogetherError::TransportSend("pipe broken".into()))
    }

    async fn recv(&mut self) -> Option<Result<String, TogetherError>> {
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), TogetherError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// One scripted outcome for a `connect()` call.
pub type DialOutcome = Result<Box<dyn Transport>, TogetherError>;

/// A connector that replays scripted dial outcomes in order.
///
/// Every dialed URL is recorded; a connect past the end of the script fails
/// with `ConnectionRefused`.
pub struct MockConnector {
    outcomes: StdMutex<VecDeque<DialOutcome>>,
    pub dialed: Arc<StdMutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new(outcomes: Vec<DialOutcome>) -> (Self, Arc<StdMutex<Vec<String>>>) {
        let dialed = Arc::new(StdMutex::new(Vec::new()));
        let connector = Self {
            outcomes: StdMutex::new(VecDeque::from(outcomes)),
            dialed: Arc::clone(&dialed),
        };
        (connector, dialed)
    }

    /// A connector whose first dial succeeds with the given transport.
    pub fn succeeding(transport: impl Transport) -> (Self, Arc<StdMutex<Vec<String>>>) {
        Self::new(vec![Ok(Box::new(transport))])
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TogetherError> {
        self.dialed.lock().unwrap().push(url.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TogetherError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "script exhausted",
                )))
            })
    }
}

/// Shorthand for a dial failure with the given I/O error kind.
pub fn io_failure(kind: std::io::ErrorKind, message: &str) -> DialOutcome {
    Err(TogetherError::Io(std::io::Error::new(kind, message)))
}

// ── JSON helper functions ───────────────────────────────────────────

/// Returns the JSON string for a `server_welcome` naming this participant.
pub fn welcome_json(session_id: &str, participant_id: &str) -> String {
    serde_json::to_string(&TogetherMessage::ServerWelcome(ServerWelcome {
        protocol_version: PROTOCOL_VERSION,
        session_id: session_id.into(),
        participant_id: participant_id.into(),
        role: ServerRole::Guest,
        is_pending: false,
        settings: RoomSettings::default(),
    }))
    .expect("welcome_json serialization")
}

/// Returns the JSON string for a `server_welcome` with a mismatched version.
pub fn welcome_json_with_version(session_id: &str, participant_id: &str, version: i32) -> String {
    serde_json::to_string(&TogetherMessage::ServerWelcome(ServerWelcome {
        protocol_version: version,
        session_id: session_id.into(),
        participant_id: participant_id.into(),
        role: ServerRole::Guest,
        is_pending: false,
        settings: RoomSettings::default(),
    }))
    .expect("welcome_json_with_version serialization")
}

/// A small but realistic track.
pub fn sample_track(id: &str) -> Track {
    Track {
        id: id.into(),
        title: format!("Track {id}"),
        artists: vec!["Artist".into()],
        duration_sec: 215,
        thumbnail_url: None,
    }
}

/// A room snapshot for `session_id` with one host participant and one track.
pub fn sample_room_state(session_id: &str) -> RoomState {
    RoomState {
        session_id: session_id.into(),
        host_id: "host-1".into(),
        participants: vec![Participant {
            id: "host-1".into(),
            name: "Host".into(),
            is_host: true,
            is_pending: false,
            is_connected: true,
        }],
        settings: RoomSettings {
            allow_guests_to_add_tracks: true,
            allow_guests_to_control_playback: false,
            require_host_approval_to_join: false,
        },
        queue: vec![sample_track("t1")],
        queue_hash: "h1".into(),
        current_index: 0,
        is_playing: true,
        position_ms: 1_500,
        repeat_mode: 0,
        shuffle_enabled: false,
        sent_at_elapsed_realtime_ms: 10_000,
    }
}

/// Returns the JSON string for a `room_state` snapshot.
pub fn room_state_json(session_id: &str) -> String {
    serde_json::to_string(&TogetherMessage::RoomState(RoomStateMessage {
        state: sample_room_state(session_id),
    }))
    .expect("room_state_json serialization")
}

/// Returns the JSON string for a `join_decision`.
pub fn join_decision_json(session_id: &str, participant_id: &str, approved: bool) -> String {
    serde_json::to_string(&TogetherMessage::JoinDecision(JoinDecision {
        session_id: session_id.into(),
        participant_id: participant_id.into(),
        approved,
    }))
    .expect("join_decision_json serialization")
}

/// Returns the JSON string for a `kick`.
pub fn kick_json(session_id: &str, participant_id: &str, reason: Option<&str>) -> String {
    serde_json::to_string(&TogetherMessage::Kick(KickParticipant {
        session_id: session_id.into(),
        participant_id: participant_id.into(),
        reason: reason.map(Into::into),
    }))
    .expect("kick_json serialization")
}

/// Returns the JSON string for a `ban`.
pub fn ban_json(session_id: &str, participant_id: &str, reason: Option<&str>) -> String {
    serde_json::to_string(&TogetherMessage::Ban(BanParticipant {
        session_id: session_id.into(),
        participant_id: participant_id.into(),
        reason: reason.map(Into::into),
    }))
    .expect("ban_json serialization")
}

/// Returns the JSON string for a `heartbeat_pong`.
pub fn pong_json(session_id: &str, ping_id: i64, client_ms: i64, server_ms: i64) -> String {
    serde_json::to_string(&TogetherMessage::HeartbeatPong(HeartbeatPong {
        session_id: session_id.into(),
        ping_id,
        client_elapsed_realtime_ms: client_ms,
        server_elapsed_realtime_ms: server_ms,
    }))
    .expect("pong_json serialization")
}

/// Returns the JSON string for a `server_error`.
pub fn server_error_json(session_id: Option<&str>, message: &str, code: Option<&str>) -> String {
    serde_json::to_string(&TogetherMessage::ServerError(ServerError {
        session_id: session_id.map(Into::into),
        message: message.into(),
        code: code.map(Into::into),
    }))
    .expect("server_error_json serialization")
}

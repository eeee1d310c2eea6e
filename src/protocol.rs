//! Wire-compatible protocol types for the Together session protocol (v1).
//!
//! Every frame on the wire is one JSON object with a `"type"` discriminator
//! naming the [`TogetherMessage`] variant (`"client_hello"`,
//! `"server_welcome"`, …) and camelCase payload fields. The variant set is
//! closed: an unrecognized discriminator or a structurally invalid payload
//! fails decoding with a `serde_json::Error` instead of coercing into a
//! wrong arm. Numeric fields (`positionMs`, `pingId`, timestamps) are signed
//! 64-bit and negative values pass through untouched — clamping is the
//! playback engine's concern, not the protocol's.

use serde::{Deserialize, Serialize};

/// Current protocol version, sent in every [`ClientHello`].
pub const PROTOCOL_VERSION: i32 = 1;

// ── Enums ───────────────────────────────────────────────────────────

/// Role assigned to a participant by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerRole {
    /// The session host; owns the queue and playback position.
    Host,
    /// A guest; may control playback or add tracks if the room settings allow.
    Guest,
}

/// Where an added track lands in the host's queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddTrackMode {
    /// Insert directly after the current track.
    PlayNext,
    /// Append to the end of the queue.
    AddToQueue,
}

/// Playback-control actions a participant can request.
///
/// Closed union: a server- or client-introduced action outside this set must
/// fail decoding rather than silently matching another arm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlAction {
    Play,
    Pause,
    #[serde(rename_all = "camelCase")]
    SeekTo { position_ms: i64 },
    SkipNext,
    SkipPrevious,
    #[serde(rename_all = "camelCase")]
    SeekToIndex {
        index: i32,
        #[serde(default)]
        position_ms: i64,
    },
    #[serde(rename_all = "camelCase")]
    SeekToTrack {
        track_id: String,
        #[serde(default)]
        position_ms: i64,
    },
    #[serde(rename_all = "camelCase")]
    SetRepeatMode { repeat_mode: i32 },
    #[serde(rename_all = "camelCase")]
    SetShuffleEnabled { shuffle_enabled: bool },
}

// ── Room data ───────────────────────────────────────────────────────

/// Host-side policy for what guests are allowed to do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    #[serde(default)]
    pub allow_guests_to_add_tracks: bool,
    #[serde(default)]
    pub allow_guests_to_control_playback: bool,
    #[serde(default)]
    pub require_host_approval_to_join: bool,
}

/// One connected client within a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub is_host: bool,
    /// `true` while the host has not yet approved the join request.
    pub is_pending: bool,
    pub is_connected: bool,
}

/// A queue entry as shared across the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<String>,
    /// Duration in seconds; `-1` when unknown.
    pub duration_sec: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Snapshot of the room broadcast by the host: queue, position, participants.
///
/// `sent_at_elapsed_realtime_ms` is the host's monotonic clock at send time;
/// combined with heartbeat offset estimates it lets a guest project the
/// playback position forward. See [`crate::clock::SessionClock`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub session_id: String,
    pub host_id: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub settings: RoomSettings,
    #[serde(default)]
    pub queue: Vec<Track>,
    #[serde(default)]
    pub queue_hash: String,
    pub current_index: i32,
    pub is_playing: bool,
    pub position_ms: i64,
    pub repeat_mode: i32,
    pub shuffle_enabled: bool,
    pub sent_at_elapsed_realtime_ms: i64,
}

// ── Message payloads ────────────────────────────────────────────────

/// First message on every connection; opens the handshake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientHello {
    pub protocol_version: i32,
    pub session_id: String,
    pub session_key: String,
    pub client_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

/// Server's handshake acknowledgement naming this client's participant id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerWelcome {
    pub protocol_version: i32,
    pub session_id: String,
    pub participant_id: String,
    pub role: ServerRole,
    pub is_pending: bool,
    pub settings: RoomSettings,
}

/// Non-fatal protocol-level rejection from the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerError {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Envelope for a [`RoomState`] snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateMessage {
    pub state: RoomState,
}

/// Guest request to control playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub session_id: String,
    pub participant_id: String,
    pub action: ControlAction,
}

/// Guest request to add a track to the shared queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddTrackRequest {
    pub session_id: String,
    pub participant_id: String,
    pub track: Track,
    pub mode: AddTrackMode,
}

/// A pending participant asking to join (host-approval flow).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub session_id: String,
    pub participant: Participant,
}

/// Host decision on a pending join request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinDecision {
    pub session_id: String,
    pub participant_id: String,
    pub approved: bool,
}

/// Broadcast when a participant joins the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantJoined {
    pub session_id: String,
    pub participant: Participant,
}

/// Broadcast when a participant leaves the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLeft {
    pub session_id: String,
    pub participant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Client-originated clock probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPing {
    pub session_id: String,
    pub ping_id: i64,
    pub client_elapsed_realtime_ms: i64,
}

/// Server echo of a [`HeartbeatPing`], stamped with the server clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPong {
    pub session_id: String,
    pub ping_id: i64,
    pub client_elapsed_realtime_ms: i64,
    pub server_elapsed_realtime_ms: i64,
}

/// Graceful departure notice sent before closing the connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientLeave {
    pub session_id: String,
    pub participant_id: String,
}

/// Server ejects a participant from the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KickParticipant {
    pub session_id: String,
    pub participant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Server permanently bans a participant from the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BanParticipant {
    pub session_id: String,
    pub participant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ── The message union ───────────────────────────────────────────────

/// The closed set of wire messages, both directions.
///
/// The discriminator field is `"type"`; payload fields sit beside it in the
/// same JSON object (internally tagged). Decoding an unknown `"type"` value
/// is an error by construction, which the session loop treats as non-fatal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TogetherMessage {
    ClientHello(ClientHello),
    ServerWelcome(ServerWelcome),
    ServerError(ServerError),
    RoomState(RoomStateMessage),
    ControlRequest(ControlRequest),
    AddTrackRequest(AddTrackRequest),
    JoinRequest(JoinRequest),
    JoinDecision(JoinDecision),
    ParticipantJoined(ParticipantJoined),
    ParticipantLeft(ParticipantLeft),
    HeartbeatPing(HeartbeatPing),
    HeartbeatPong(HeartbeatPong),
    ClientLeave(ClientLeave),
    #[serde(rename = "kick")]
    Kick(KickParticipant),
    #[serde(rename = "ban")]
    Ban(BanParticipant),
}

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
    fn client_hello_wire_shape() {
        let msg = TogetherMessage::ClientHello(ClientHello {
            protocol_version: PROTOCOL_VERSION,
            session_id: "sid".into(),
            session_key: "key".into(),
            client_id: "cid".into(),
            display_name: "Alice".into(),
            package_name: None,
        });
        let value: serde_json::Value = serde_json::to_value(&msg).expect("serialize client_hello");
        assert_eq!(value["type"], "client_hello");
        assert_eq!(value["protocolVersion"], 1);
        assert_eq!(value["sessionId"], "sid");
        // Absent optional field must not serialize at all.
        assert!(value.get("packageName").is_none());
    }

    #[test]
    fn control_action_unit_variants_carry_only_the_tag() {
        let json = serde_json::to_string(&ControlAction::Play).unwrap();
        assert_eq!(json, r#"{"type":"play"}"#);
        let json = serde_json::to_string(&ControlAction::SkipPrevious).unwrap();
        assert_eq!(json, r#"{"type":"skip_previous"}"#);
    }

    #[test]
    fn seek_to_index_position_defaults_to_zero() {
        let action: ControlAction =
            serde_json::from_str(r#"{"type":"seek_to_index","index":3}"#).unwrap();
        assert_eq!(
            action,
            ControlAction::SeekToIndex {
                index: 3,
                position_ms: 0
            }
        );
    }

    #[test]
    fn unknown_message_discriminant_fails() {
        let result = serde_json::from_str::<TogetherMessage>(
            r#"{"type":"surprise_variant","sessionId":"sid"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_control_action_fails() {
        let result = serde_json::from_str::<ControlAction>(r#"{"type":"set_volume","level":5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn kick_and_ban_use_short_discriminants() {
        let kick = TogetherMessage::Kick(KickParticipant {
            session_id: "sid".into(),
            participant_id: "pid".into(),
            reason: None,
        });
        let value = serde_json::to_value(&kick).unwrap();
        assert_eq!(value["type"], "kick");

        let ban = TogetherMessage::Ban(BanParticipant {
            session_id: "sid".into(),
            participant_id: "pid".into(),
            reason: Some("spam".into()),
        });
        let value = serde_json::to_value(&ban).unwrap();
        assert_eq!(value["type"], "ban");
        assert_eq!(value["reason"], "spam");
    }

    #[test]
    fn roles_and_modes_are_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&ServerRole::Host).unwrap(),
            r#""HOST""#
        );
        assert_eq!(
            serde_json::to_string(&AddTrackMode::PlayNext).unwrap(),
            r#""PLAY_NEXT""#
        );
        assert_eq!(
            serde_json::from_str::<AddTrackMode>(r#""ADD_TO_QUEUE""#).unwrap(),
            AddTrackMode::AddToQueue
        );
    }

    #[test]
    fn negative_timestamps_are_preserved() {
        let pong: HeartbeatPong = serde_json::from_str(
            r#"{"sessionId":"sid","pingId":-7,"clientElapsedRealtimeMs":-100,"serverElapsedRealtimeMs":-1}"#,
        )
        .unwrap();
        assert_eq!(pong.ping_id, -7);
        assert_eq!(pong.client_elapsed_realtime_ms, -100);
        assert_eq!(pong.server_elapsed_realtime_ms, -1);
    }
}

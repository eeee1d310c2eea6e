#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Protocol serialization tests for the Together Client.
//!
//! Verifies wire-shape fixtures that match real server output, round-trip
//! serialization across the `TogetherMessage` union and every
//! `ControlAction`, defaulting of optional fields, and rejection of unknown
//! discriminants.

use together_client::protocol::{
    AddTrackMode, AddTrackRequest, ClientHello, ClientLeave, ControlAction, ControlRequest,
    HeartbeatPing, JoinDecision, JoinRequest, Participant, ParticipantJoined, ParticipantLeft,
    RoomSettings, RoomStateMessage, ServerRole, TogetherMessage, PROTOCOL_VERSION,
};

mod common;
use common::{sample_room_state, sample_track};

// ════════════════════════════════════════════════════════════════════
// Helper
// ════════════════════════════════════════════════════════════════════

/// Serialize `val` to JSON, then deserialize back to `T` and return it.
fn round_trip<T: serde::Serialize + serde::de::DeserializeOwned>(val: &T) -> T {
    let json = serde_json::to_string(val).expect("serialize");
    serde_json::from_str(&json).expect("deserialize")
}

// ════════════════════════════════════════════════════════════════════
// Wire fixtures (match real server output)
// ════════════════════════════════════════════════════════════════════

#[test]
fn server_welcome_fixture_decodes() {
    let json = r#"{
        "type": "server_welcome",
        "protocolVersion": 1,
        "sessionId": "sess-1",
        "participantId": "p-42",
        "role": "GUEST",
        "isPending": true,
        "settings": {
            "allowGuestsToAddTracks": true,
            "allowGuestsToControlPlayback": false,
            "requireHostApprovalToJoin": true
        }
    }"#;
    let msg: TogetherMessage = serde_json::from_str(json).expect("decode server_welcome");
    let TogetherMessage::ServerWelcome(welcome) = msg else {
        panic!("expected ServerWelcome variant");
    };
    assert_eq!(welcome.protocol_version, PROTOCOL_VERSION);
    assert_eq!(welcome.session_id, "sess-1");
    assert_eq!(welcome.participant_id, "p-42");
    assert_eq!(welcome.role, ServerRole::Guest);
    assert!(welcome.is_pending);
    assert!(welcome.settings.allow_guests_to_add_tracks);
    assert!(welcome.settings.require_host_approval_to_join);
}

#[test]
fn room_state_fixture_decodes() {
    let json = r#"{
        "type": "room_state",
        "state": {
            "sessionId": "sess-1",
            "hostId": "p-1",
            "participants": [
                {"id": "p-1", "name": "Host", "isHost": true, "isPending": false, "isConnected": true},
                {"id": "p-2", "name": "Guest", "isHost": false, "isPending": false, "isConnected": true}
            ],
            "settings": {"allowGuestsToAddTracks": false, "allowGuestsToControlPlayback": false, "requireHostApprovalToJoin": false},
            "queue": [
                {"id": "trk-9", "title": "Song", "artists": ["A", "B"], "durationSec": 241, "thumbnailUrl": "https://example.com/t.jpg"}
            ],
            "queueHash": "abc123",
            "currentIndex": 0,
            "isPlaying": true,
            "positionMs": 63250,
            "repeatMode": 2,
            "shuffleEnabled": false,
            "sentAtElapsedRealtimeMs": 123456789
        }
    }"#;
    let msg: TogetherMessage = serde_json::from_str(json).expect("decode room_state");
    let TogetherMessage::RoomState(RoomStateMessage { state }) = msg else {
        panic!("expected RoomState variant");
    };
    assert_eq!(state.session_id, "sess-1");
    assert_eq!(state.participants.len(), 2);
    assert_eq!(state.queue[0].artists, vec!["A", "B"]);
    assert_eq!(
        state.queue[0].thumbnail_url.as_deref(),
        Some("https://example.com/t.jpg")
    );
    assert_eq!(state.position_ms, 63_250);
    assert_eq!(state.repeat_mode, 2);
    assert_eq!(state.sent_at_elapsed_realtime_ms, 123_456_789);
}

#[test]
fn room_state_omitted_collections_default_empty() {
    let json = r#"{
        "type": "room_state",
        "state": {
            "sessionId": "sess-1",
            "hostId": "p-1",
            "currentIndex": -1,
            "isPlaying": false,
            "positionMs": 0,
            "repeatMode": 0,
            "shuffleEnabled": false,
            "sentAtElapsedRealtimeMs": 0
        }
    }"#;
    let msg: TogetherMessage = serde_json::from_str(json).expect("decode sparse room_state");
    let TogetherMessage::RoomState(RoomStateMessage { state }) = msg else {
        panic!("expected RoomState variant");
    };
    assert!(state.participants.is_empty());
    assert!(state.queue.is_empty());
    assert!(state.queue_hash.is_empty());
    assert_eq!(state.settings, RoomSettings::default());
    assert_eq!(state.current_index, -1);
}

#[test]
fn heartbeat_pong_fixture_decodes() {
    let json = r#"{"type":"heartbeat_pong","sessionId":"sess-1","pingId":7,"clientElapsedRealtimeMs":1000,"serverElapsedRealtimeMs":1150}"#;
    let msg: TogetherMessage = serde_json::from_str(json).expect("decode heartbeat_pong");
    let TogetherMessage::HeartbeatPong(pong) = msg else {
        panic!("expected HeartbeatPong variant");
    };
    assert_eq!(pong.ping_id, 7);
    assert_eq!(pong.client_elapsed_realtime_ms, 1_000);
    assert_eq!(pong.server_elapsed_realtime_ms, 1_150);
}

#[test]
fn client_hello_encodes_expected_shape() {
    let msg = TogetherMessage::ClientHello(ClientHello {
        protocol_version: PROTOCOL_VERSION,
        session_id: "sess-1".into(),
        session_key: "secret".into(),
        client_id: "cid-1".into(),
        display_name: "Alice".into(),
        package_name: Some("com.example.player".into()),
    });
    let value = serde_json::to_value(&msg).expect("serialize client_hello");
    assert_eq!(value["type"], "client_hello");
    assert_eq!(value["protocolVersion"], 1);
    assert_eq!(value["sessionKey"], "secret");
    assert_eq!(value["displayName"], "Alice");
    assert_eq!(value["packageName"], "com.example.player");
}

#[test]
fn server_error_fields_are_optional() {
    let json = r#"{"type":"server_error","message":"invalid session key"}"#;
    let msg: TogetherMessage = serde_json::from_str(json).expect("decode server_error");
    let TogetherMessage::ServerError(err) = msg else {
        panic!("expected ServerError variant");
    };
    assert_eq!(err.message, "invalid session key");
    assert!(err.session_id.is_none());
    assert!(err.code.is_none());
}

// ════════════════════════════════════════════════════════════════════
// TogetherMessage round-trips
// ════════════════════════════════════════════════════════════════════

#[test]
fn control_request_round_trip() {
    let msg = TogetherMessage::ControlRequest(ControlRequest {
        session_id: "sess-1".into(),
        participant_id: "p-2".into(),
        action: ControlAction::SeekTo { position_ms: 42_000 },
    });
    assert_eq!(round_trip(&msg), msg);

    let value = serde_json::to_value(&msg).expect("serialize");
    assert_eq!(value["type"], "control_request");
    assert_eq!(value["action"]["type"], "seek_to");
    assert_eq!(value["action"]["positionMs"], 42_000);
}

#[test]
fn add_track_request_round_trip() {
    let msg = TogetherMessage::AddTrackRequest(AddTrackRequest {
        session_id: "sess-1".into(),
        participant_id: "p-2".into(),
        track: sample_track("trk-1"),
        mode: AddTrackMode::PlayNext,
    });
    let deser = round_trip(&msg);
    assert_eq!(deser, msg);

    let value = serde_json::to_value(&msg).expect("serialize");
    assert_eq!(value["mode"], "PLAY_NEXT");
    assert_eq!(value["track"]["durationSec"], 215);
}

#[test]
fn join_flow_messages_round_trip() {
    let participant = Participant {
        id: "p-9".into(),
        name: "Newcomer".into(),
        is_host: false,
        is_pending: true,
        is_connected: true,
    };
    let request = TogetherMessage::JoinRequest(JoinRequest {
        session_id: "sess-1".into(),
        participant: participant.clone(),
    });
    assert_eq!(round_trip(&request), request);

    let decision = TogetherMessage::JoinDecision(JoinDecision {
        session_id: "sess-1".into(),
        participant_id: "p-9".into(),
        approved: false,
    });
    assert_eq!(round_trip(&decision), decision);

    let joined = TogetherMessage::ParticipantJoined(ParticipantJoined {
        session_id: "sess-1".into(),
        participant,
    });
    assert_eq!(round_trip(&joined), joined);

    let left = TogetherMessage::ParticipantLeft(ParticipantLeft {
        session_id: "sess-1".into(),
        participant_id: "p-9".into(),
        reason: Some("left the party".into()),
    });
    assert_eq!(round_trip(&left), left);
}

#[test]
fn lifecycle_messages_round_trip() {
    let ping = TogetherMessage::HeartbeatPing(HeartbeatPing {
        session_id: "sess-1".into(),
        ping_id: 3,
        client_elapsed_realtime_ms: 98_765,
    });
    assert_eq!(round_trip(&ping), ping);
    let value = serde_json::to_value(&ping).expect("serialize");
    assert_eq!(value["type"], "heartbeat_ping");

    let leave = TogetherMessage::ClientLeave(ClientLeave {
        session_id: "sess-1".into(),
        participant_id: "p-2".into(),
    });
    assert_eq!(round_trip(&leave), leave);
    let value = serde_json::to_value(&leave).expect("serialize");
    assert_eq!(value["type"], "client_leave");
}

#[test]
fn full_room_state_round_trip() {
    let msg = TogetherMessage::RoomState(RoomStateMessage {
        state: sample_room_state("sess-1"),
    });
    assert_eq!(round_trip(&msg), msg);
}

// ════════════════════════════════════════════════════════════════════
// ControlAction coverage
// ════════════════════════════════════════════════════════════════════

#[test]
fn every_control_action_round_trips() {
    let actions = vec![
        ControlAction::Play,
        ControlAction::Pause,
        ControlAction::SeekTo { position_ms: 1_000 },
        ControlAction::SkipNext,
        ControlAction::SkipPrevious,
        ControlAction::SeekToIndex {
            index: 4,
            position_ms: 0,
        },
        ControlAction::SeekToTrack {
            track_id: "trk-7".into(),
            position_ms: 30_000,
        },
        ControlAction::SetRepeatMode { repeat_mode: 1 },
        ControlAction::SetShuffleEnabled {
            shuffle_enabled: true,
        },
    ];
    for action in actions {
        assert_eq!(round_trip(&action), action);
    }
}

#[test]
fn seek_to_track_position_defaults_when_omitted() {
    let action: ControlAction =
        serde_json::from_str(r#"{"type":"seek_to_track","trackId":"trk-7"}"#)
            .expect("decode seek_to_track");
    assert_eq!(
        action,
        ControlAction::SeekToTrack {
            track_id: "trk-7".into(),
            position_ms: 0
        }
    );
}

// ════════════════════════════════════════════════════════════════════
// Rejection of malformed input
// ════════════════════════════════════════════════════════════════════

#[test]
fn unknown_message_type_is_rejected() {
    let result =
        serde_json::from_str::<TogetherMessage>(r#"{"type":"telemetry","sessionId":"sess-1"}"#);
    assert!(result.is_err());
}

#[test]
fn missing_discriminator_is_rejected() {
    let result = serde_json::from_str::<TogetherMessage>(r#"{"sessionId":"sess-1"}"#);
    assert!(result.is_err());
}

#[test]
fn structurally_invalid_payload_is_rejected() {
    // server_welcome without its required fields must not decode.
    let result = serde_json::from_str::<TogetherMessage>(r#"{"type":"server_welcome"}"#);
    assert!(result.is_err());
}

#[test]
fn unknown_role_is_rejected() {
    let result = serde_json::from_str::<ServerRole>(r#""MODERATOR""#);
    assert!(result.is_err());
}

#[test]
fn non_object_frame_is_rejected() {
    assert!(serde_json::from_str::<TogetherMessage>(r#""hello""#).is_err());
    assert!(serde_json::from_str::<TogetherMessage>("[1,2,3]").is_err());
    assert!(serde_json::from_str::<TogetherMessage>("not json at all").is_err());
}

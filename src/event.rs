//! Consumer-facing events emitted by the client.

use std::sync::Arc;

use crate::error::TogetherError;
use crate::protocol::{HeartbeatPong, JoinDecision, RoomState, ServerWelcome};

/// Events surfaced to subscribers of a [`TogetherClient`](crate::TogetherClient).
///
/// This is the only channel through which inbound protocol activity reaches
/// the application. Unlike [`TogetherMessage`](crate::protocol::TogetherMessage)
/// it is consumer-shaped: already filtered to the current session (and, where
/// applicable, to this participant), with local receipt stamps attached.
///
/// Delivery is bounded and non-blocking: a subscriber that falls behind
/// observes [`Lagged`](tokio::sync::broadcast::error::RecvError::Lagged) and
/// loses the overwritten events rather than stalling protocol processing.
#[derive(Debug, Clone)]
pub enum TogetherEvent {
    /// Handshake acknowledged; the client now has a participant identity.
    Welcome(ServerWelcome),
    /// A room snapshot for the current session.
    RoomState(RoomState),
    /// The host decided on this client's pending join request.
    JoinDecision(JoinDecision),
    /// Non-fatal protocol-level rejection reported by the server.
    ServerIssue {
        message: String,
        code: Option<String>,
    },
    /// A client-side failure: connection attempt exhausted, frame decode
    /// failure, membership termination (kick/ban), or a loop-fatal error.
    Error {
        message: String,
        cause: Option<Arc<TogetherError>>,
    },
    /// A heartbeat pong for the current session, stamped with the local
    /// monotonic receipt time (see [`crate::clock::monotonic_ms`]).
    HeartbeatPong {
        pong: HeartbeatPong,
        received_at_monotonic_ms: i64,
    },
    /// Terminal event of a connection: the receive loop has exited and the
    /// state has returned to Idle. Emitted exactly once per successful
    /// connection, whatever caused the exit.
    Disconnected,
}

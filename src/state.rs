//! Connection lifecycle states.

use crate::link::JoinInfo;

/// The connection lifecycle of a [`TogetherClient`](crate::TogetherClient).
///
/// At most one state holds at any time; transitions per connection attempt
/// are monotonic (`Idle` → `Connecting*` → `Connected*` → `Idle`) and no
/// state ever has two live receive loops behind it. Observe the current
/// value through [`TogetherClient::state`](crate::TogetherClient::state).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No active or pending connection.
    #[default]
    Idle,
    /// Handshake in flight for a locally-hosted session.
    Connecting(JoinInfo),
    /// Handshake succeeded for a locally-hosted session; receive loop active.
    Connected(JoinInfo),
    /// Handshake in flight for a manually-specified remote endpoint.
    ConnectingRemote { ws_url: String, session_id: String },
    /// Handshake succeeded for a remote endpoint; receive loop active.
    ConnectedRemote { ws_url: String, session_id: String },
}

impl ConnectionState {
    /// Returns `true` for any state other than [`Idle`](ConnectionState::Idle).
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Idle)
    }

    /// Returns `true` once a handshake has completed.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected(_) | ConnectionState::ConnectedRemote { .. }
        )
    }

    /// The session id of the active or pending connection, if any.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ConnectionState::Idle => None,
            ConnectionState::Connecting(info) | ConnectionState::Connected(info) => {
                Some(&info.session_id)
            }
            ConnectionState::ConnectingRemote { session_id, .. }
            | ConnectionState::ConnectedRemote { session_id, .. } => Some(session_id),
        }
    }
}

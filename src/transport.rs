//! Transport abstraction for the Together session protocol.
//!
//! The [`Transport`] trait defines a bidirectional text message channel
//! between the client and the session-coordination server. The protocol uses
//! JSON text frames, so every transport implementation must handle framing
//! internally (e.g., WebSocket frames).
//!
//! Unlike the transport itself, connection *establishment* is part of the
//! client's job here — the session loop tries candidate endpoint URLs in
//! order with ws↔wss fallback — so dialing is abstracted separately behind
//! the [`Connector`] trait. The default implementation is
//! [`WebSocketConnector`](crate::transports::WebSocketConnector) (enabled by
//! the `transport-websocket` feature); tests substitute scripted connectors.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TogetherError;

/// Transport-level timing configuration.
///
/// The client never re-implements timeouts; transports enforce them. The
/// keepalive probe detects silently-dead connections independently of the
/// application-level heartbeat sub-protocol.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Deadline for establishing the connection. Default **15 s**.
    pub connect_timeout: Duration,
    /// How long an unanswered keepalive probe may remain outstanding before
    /// the receive side fails. Default **30 s**.
    pub read_timeout: Duration,
    /// Deadline for one outbound send. Default **15 s**.
    pub write_timeout: Duration,
    /// Idle-read interval after which a keepalive probe is sent.
    /// Default **25 s**.
    pub keepalive_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(15),
            keepalive_interval: Duration::from_secs(25),
        }
    }
}

/// A bidirectional text message transport for the Together session protocol.
///
/// Implementors shuttle serialized JSON strings between the client and the
/// server. Each call to [`send`](Transport::send) transmits one complete JSON
/// message; each call to [`recv`](Transport::recv) yields one.
///
/// # Object Safety
///
/// This trait is object-safe; the session loop owns its transport as a
/// `Box<dyn Transport>` returned by a [`Connector`].
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because the session
/// loop awaits it inside `tokio::select!`. If `recv` is cancelled before
/// completion, calling it again must not lose data.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`TogetherError::TransportSend`] if the message could not be
    /// sent (connection broken, write deadline exceeded).
    async fn send(&mut self, message: String) -> Result<(), TogetherError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))` — a complete text message was received
    /// - `Some(Err(e))` — a transport error occurred
    /// - `None` — the connection was closed cleanly by the server
    ///
    /// Non-text frames are consumed internally and never surface here.
    ///
    /// # Cancel Safety
    ///
    /// This method **MUST** be cancel-safe (see [trait documentation](Transport)).
    async fn recv(&mut self) -> Option<Result<String, TogetherError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Callers on teardown
    /// paths treat close as best-effort and swallow the error; implementations
    /// should still release resources when the handshake fails.
    async fn close(&mut self) -> Result<(), TogetherError>;
}

/// Dials one candidate endpoint URL and yields a connected [`Transport`].
///
/// The session loop calls this once per candidate, in order, stopping at the
/// first success. Implementations should honor
/// [`TransportConfig::connect_timeout`] and classify dialing failures into
/// the matching [`TogetherError`] variants (`InvalidUrl`, `Tls`, `Timeout`,
/// `Io`) so connection errors surface with accurate reasons.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establish a connection to `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TogetherError>;
}

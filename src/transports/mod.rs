//! Built-in [`Transport`](crate::transport::Transport) implementations.
//!
//! Currently one: [`WebSocketTransport`] over `tokio-tungstenite`, gated by
//! the default-on `transport-websocket` feature, together with the
//! [`WebSocketConnector`] the client dials through by default.

#[cfg(feature = "transport-websocket")]
mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};

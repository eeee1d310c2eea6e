//! # Together Client
//!
//! Transport-agnostic Rust client for the Together synchronized
//! group-listening protocol.
//!
//! This crate provides a high-level async client that joins a Together
//! session over JSON text messages on any bidirectional transport, tracks the
//! connection lifecycle, and surfaces room activity as typed events.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`Transport`] trait for any backend
//! - **Wire-compatible** — all protocol types match the server's v1 format exactly
//! - **WebSocket built-in** — default `transport-websocket` feature provides
//!   [`WebSocketTransport`](transports::WebSocketTransport) with ws↔wss fallback
//! - **Event-driven** — subscribe to typed [`TogetherEvent`]s on a bounded
//!   broadcast channel; watch [`ConnectionState`] transitions live
//! - **Clock correlation** — heartbeat pings/pongs feed a [`SessionClock`]
//!   that estimates the server clock offset for playback alignment
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use together_client::{ClientConfig, JoinInfo, TogetherClient, TogetherEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = TogetherClient::new(ClientConfig::new());
//!     let mut events = client.events();
//!
//!     let join_info = JoinInfo::new("192.168.1.20", 52712, "sid", "key");
//!     client.connect(join_info, "Alice").await;
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             TogetherEvent::RoomState(state) => println!("{} tracks queued", state.queue.len()),
//!             TogetherEvent::Disconnected => break,
//!             _ => {}
//!         }
//!     }
//! }
//! ```

pub mod client;
pub mod clock;
pub mod error;
pub mod event;
pub mod link;
pub mod protocol;
pub mod state;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{ClientConfig, TogetherClient};
pub use clock::{ClockSnapshot, SessionClock};
pub use error::TogetherError;
pub use event::TogetherEvent;
pub use link::JoinInfo;
pub use protocol::{
    AddTrackMode, ControlAction, Participant, RoomSettings, RoomState, ServerRole, Track,
    TogetherMessage, PROTOCOL_VERSION,
};
pub use state::ConnectionState;
pub use transport::{Connector, Transport, TransportConfig};

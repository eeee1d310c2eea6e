//! Error types for the Together client.

use thiserror::Error;

/// Errors that can occur when using the Together client.
#[derive(Debug, Error)]
pub enum TogetherError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The websocket endpoint URL could not be parsed or uses a bad scheme.
    #[error("invalid server websocket URL: {0}")]
    InvalidUrl(String),

    /// The TLS handshake with the server failed.
    #[error("TLS handshake failed: {0}")]
    Tls(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Together client operations.
pub type Result<T> = std::result::Result<T, TogetherError>;

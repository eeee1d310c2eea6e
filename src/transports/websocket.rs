//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] implements [`Transport`] over a WebSocket
//! connection. Both `ws://` and `wss://` URLs are supported — TLS is handled
//! transparently via [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream),
//! which is what makes the client's alternate-scheme fallback candidate work.
//!
//! Timeouts and the keepalive probe from [`TransportConfig`] are enforced
//! here, at the transport level, so the session loop above stays free of
//! timing concerns.
//!
//! # Feature gate
//!
//! Only available with the `transport-websocket` feature (enabled by default).

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::TogetherError;
use crate::transport::{Connector, Transport, TransportConfig};

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Map a tungstenite error into the matching [`TogetherError`] variant so
/// the client's failure classifier can name the reason accurately.
fn map_connect_error(err: tokio_tungstenite::tungstenite::Error) -> TogetherError {
    use tokio_tungstenite::tungstenite::Error;
    match err {
        Error::Url(url_err) => TogetherError::InvalidUrl(url_err.to_string()),
        Error::Tls(tls_err) => TogetherError::Tls(tls_err.to_string()),
        Error::Io(io_err) => TogetherError::Io(io_err),
        other => TogetherError::Io(std::io::Error::other(other)),
    }
}

/// A [`Transport`] backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: it awaits the underlying stream
/// through `tokio::time::timeout`, and dropping the future before completion
/// does not consume or lose messages.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    config: TransportConfig,
    /// A keepalive probe is in flight and unanswered.
    awaiting_pong: bool,
    closed: bool,
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection with the default [`TransportConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`TogetherError::InvalidUrl`] for malformed URLs or schemes,
    /// [`TogetherError::Tls`] for TLS handshake failures,
    /// [`TogetherError::Timeout`] when the connect deadline elapses, and
    /// [`TogetherError::Io`] otherwise (the I/O [`ErrorKind`](std::io::ErrorKind)
    /// is preserved).
    pub async fn connect(url: &str) -> Result<Self, TogetherError> {
        Self::connect_with_config(url, TransportConfig::default()).await
    }

    /// Establish a new WebSocket connection with an explicit [`TransportConfig`].
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub async fn connect_with_config(
        url: &str,
        config: TransportConfig,
    ) -> Result<Self, TogetherError> {
        tracing::debug!(url = %url, "connecting to session server");

        let (stream, _response) =
            tokio::time::timeout(config.connect_timeout, tokio_tungstenite::connect_async(url))
                .await
                .map_err(|_| TogetherError::Timeout)?
                .map_err(map_connect_error)?;

        tracing::info!(url = %url, "WebSocket connection established");

        Ok(Self {
            stream,
            config,
            awaiting_pong: false,
            closed: false,
        })
    }

    /// Wrap an already-established WebSocket stream.
    ///
    /// Useful when custom TLS configuration or proxy headers are needed;
    /// perform the handshake yourself and hand the stream over.
    pub fn from_stream(stream: WsStream, config: TransportConfig) -> Self {
        Self {
            stream,
            config,
            awaiting_pong: false,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), TogetherError> {
        if self.closed {
            return Err(TogetherError::TransportClosed);
        }
        let write = self.stream.send(Message::Text(message.into()));
        match tokio::time::timeout(self.config.write_timeout, write).await {
            Ok(result) => result.map_err(|e| TogetherError::TransportSend(e.to_string())),
            Err(_) => Err(TogetherError::TransportSend("write timed out".into())),
        }
    }

    async fn recv(&mut self) -> Option<Result<String, TogetherError>> {
        loop {
            // While a probe is outstanding, any inbound frame within the read
            // deadline counts as life; otherwise the connection is dead.
            let wait = if self.awaiting_pong {
                self.config.read_timeout
            } else {
                self.config.keepalive_interval
            };

            let item = match tokio::time::timeout(wait, self.stream.next()).await {
                Ok(item) => item,
                Err(_) if self.awaiting_pong => {
                    return Some(Err(TogetherError::TransportReceive(
                        "keepalive probe unanswered".into(),
                    )));
                }
                Err(_) => {
                    tracing::debug!("read idle, sending keepalive ping");
                    if let Err(e) = self.stream.send(Message::Ping(Vec::new().into())).await {
                        return Some(Err(TogetherError::TransportReceive(e.to_string())));
                    }
                    self.awaiting_pong = true;
                    continue;
                }
            };
            self.awaiting_pong = false;

            let msg = match item {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(TogetherError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                Message::Ping(_) => {
                    // tungstenite auto-queues a Pong reply; nothing to do.
                }
                Message::Pong(_) => {
                    tracing::trace!("keepalive pong received");
                }
                Message::Binary(_) => {
                    tracing::warn!("skipping unexpected binary WebSocket frame");
                }
                Message::Frame(_) => {
                    // Never produced by the read half; kept for exhaustiveness.
                    tracing::debug!("skipping raw WebSocket frame");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TogetherError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| TogetherError::TransportSend(e.to_string()))
    }
}

/// The default [`Connector`]: dials [`WebSocketTransport`]s with a shared
/// [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    config: TransportConfig,
}

impl WebSocketConnector {
    /// Create a connector with an explicit transport configuration.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TogetherError> {
        let transport = WebSocketTransport::connect_with_config(url, self.config.clone()).await?;
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
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
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, TogetherError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, TogetherError::Io(_)));
    }

    #[tokio::test]
    async fn connect_times_out_on_blackhole_address() {
        let config = TransportConfig {
            connect_timeout: std::time::Duration::from_millis(50),
            ..TransportConfig::default()
        };
        // Non-routable TEST-NET-1 address guarantees a hang, not a refusal.
        let err = WebSocketTransport::connect_with_config("ws://192.0.2.1:1", config)
            .await
            .unwrap_err();
        assert!(matches!(err, TogetherError::Timeout));
    }

    // ── Mock-server helpers ─────────────────────────────────────────

    use tokio::net::TcpListener;

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and return the URL to connect to.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn recv_receives_text_messages_in_order() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text("first".into())).await.unwrap();
            ws.send(Message::Text("second".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), "first");
        assert_eq!(transport.recv().await.unwrap().unwrap(), "second");
    }

    #[tokio::test]
    async fn recv_returns_none_on_close_frame() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), "after_binary");
    }

    #[tokio::test]
    async fn idle_read_sends_keepalive_probe() {
        let url = start_mock_server(|mut ws| async move {
            // Stay silent; tungstenite answers the client's Ping with a Pong
            // automatically once we drive the stream.
            loop {
                match ws.next().await {
                    Some(Ok(_)) => continue,
                    _ => break,
                }
            }
        })
        .await;

        let config = TransportConfig {
            keepalive_interval: std::time::Duration::from_millis(20),
            read_timeout: std::time::Duration::from_millis(200),
            ..TransportConfig::default()
        };
        let mut transport = WebSocketTransport::connect_with_config(&url, config)
            .await
            .unwrap();

        // The probe's pong keeps the connection alive for at least one cycle;
        // recv stays pending rather than erroring immediately.
        let outcome =
            tokio::time::timeout(std::time::Duration::from_millis(60), transport.recv()).await;
        assert!(outcome.is_err(), "recv should still be waiting after a pong");
    }

    #[tokio::test]
    async fn unanswered_probe_fails_the_receive() {
        // Raw TCP server that completes the WebSocket handshake and then
        // never reads again, so probes go unanswered.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let _ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            // Hold the socket open without servicing it.
            std::future::pending::<()>().await;
        });

        let config = TransportConfig {
            keepalive_interval: std::time::Duration::from_millis(20),
            read_timeout: std::time::Duration::from_millis(50),
            ..TransportConfig::default()
        };
        let mut transport = WebSocketTransport::connect_with_config(&format!("ws://{addr}"), config)
            .await
            .unwrap();

        let result = transport.recv().await;
        assert!(matches!(
            result,
            Some(Err(TogetherError::TransportReceive(_)))
        ));
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("oops".to_string()).await.unwrap_err();
        assert!(matches!(err, TogetherError::TransportClosed));
    }

    #[tokio::test]
    async fn double_close_is_idempotent() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn send_round_trip() {
        let url = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.send("echo_me".to_string()).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), "echo_me");
    }

    #[tokio::test]
    async fn connector_boxes_a_working_transport() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text("via_connector".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let connector = WebSocketConnector::default();
        let mut transport = connector.connect(&url).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), "via_connector");
    }
}

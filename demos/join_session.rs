//! # Join Session Example
//!
//! Demonstrates a complete Together client lifecycle:
//!
//! 1. Decode a shared session link into a [`JoinInfo`]
//! 2. Connect to the session host over WebSocket (with ws↔wss fallback)
//! 3. React to room events (welcome, snapshots, heartbeat pongs)
//! 4. Feed heartbeat pongs into a [`SessionClock`] for offset estimation
//! 5. Disconnect gracefully on Ctrl+C or when the session ends
//!
//! ## Running
//!
//! ```sh
//! # Paste the link shared by the session host:
//! TOGETHER_LINK='ws://192.168.1.20:52712/together?sid=…&key=…' \
//!     cargo run --example join_session
//! ```

use together_client::clock::monotonic_ms;
use together_client::{link, ClientConfig, SessionClock, TogetherClient, TogetherEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Initialize tracing. Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let raw_link = std::env::var("TOGETHER_LINK")
        .map_err(|_| "set TOGETHER_LINK to the session link shared by the host")?;
    let join_info = link::decode(&raw_link).ok_or("TOGETHER_LINK is not a valid session link")?;
    tracing::info!("Joining session {} at {}", join_info.session_id, join_info.host);

    let session_id = join_info.session_id.clone();
    let client = TogetherClient::new(ClientConfig::new().with_package_name("together-client-demo"));
    let mut events = client.events();
    let mut clock = SessionClock::new();
    let mut next_ping_id: i64 = 0;

    client.connect(join_info, "RustListener").await;

    // A heartbeat every few seconds keeps the clock estimate fresh.
    let mut heartbeat = tokio::time::interval(std::time::Duration::from_secs(5));

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("lagged behind, {missed} events lost");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };

                match event {
                    TogetherEvent::Welcome(welcome) => {
                        tracing::info!(
                            "Joined as {} ({:?}){}",
                            welcome.participant_id,
                            welcome.role,
                            if welcome.is_pending { ", awaiting host approval" } else { "" }
                        );
                    }
                    TogetherEvent::JoinDecision(decision) => {
                        if decision.approved {
                            tracing::info!("Host approved the join request");
                        } else {
                            tracing::warn!("Host declined the join request");
                        }
                    }
                    TogetherEvent::RoomState(state) => {
                        let now_playing = state
                            .queue
                            .get(usize::try_from(state.current_index).unwrap_or(usize::MAX))
                            .map(|track| track.title.as_str())
                            .unwrap_or("nothing");
                        tracing::info!(
                            "Room update: {} listeners, {} queued, playing: {now_playing}",
                            state.participants.len(),
                            state.queue.len(),
                        );
                    }
                    TogetherEvent::HeartbeatPong { pong, received_at_monotonic_ms } => {
                        let snapshot = clock.on_pong(
                            pong.client_elapsed_realtime_ms,
                            received_at_monotonic_ms,
                            pong.server_elapsed_realtime_ms,
                        );
                        tracing::debug!(
                            "Clock: offset {} ms, rtt {} ms",
                            snapshot.estimated_offset_ms,
                            snapshot.estimated_rtt_ms,
                        );
                    }
                    TogetherEvent::ServerIssue { message, code } => {
                        tracing::warn!("Server issue ({code:?}): {message}");
                    }
                    TogetherEvent::Error { message, .. } => {
                        tracing::error!("{message}");
                    }
                    TogetherEvent::Disconnected => {
                        tracing::info!("Session ended");
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                client.send_heartbeat(&session_id, next_ping_id, monotonic_ms());
                next_ping_id += 1;
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C, leaving session");
                client.disconnect().await;
                break;
            }
        }
    }

    Ok(())
}

//! Live delivery of new channel messages over WebSocket.
//!
//! A follower connects to `/:channel_id/live`, receives a `hello` frame, then
//! one `message` frame per message posted while it stays connected.

use crate::error::ApiError;
use crate::handlers::AppState;
use crate::metrics::{self, LiveMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use notify_relay_core::RelayError;
use relay_protocol::live::{self, LiveFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval_at, Instant};
use tracing::{debug, warn};

/// Upgrade to a live follower connection. Unknown channels answer 404
/// before the upgrade.
pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<Response, ApiError> {
    if !state.relay.registry().channel_exists(&channel_id).await? {
        return Err(RelayError::NoSuchChannel(channel_id).into());
    }

    // Follow only once the upgrade went through, so every follow is paired
    // with the unfollow at the end of `handle_live`.
    Ok(ws.on_upgrade(move |socket| handle_live(socket, state, channel_id)))
}

/// Drive one follower connection until either side goes away.
async fn handle_live(socket: WebSocket, state: Arc<AppState>, channel_id: String) {
    let mut messages = match state.relay.follow(&channel_id).await {
        Ok(messages) => messages,
        Err(e) => {
            warn!(channel = %channel_id, error = %e, "Could not follow channel");
            return;
        }
    };
    metrics::set_live_channels(state.relay.live_stats().channel_count);

    let _metrics_guard = LiveMetricsGuard::new();
    debug!(channel = %channel_id, "Live follower connected");

    let (mut sender, mut receiver) = socket.split();

    if send_frame(&mut sender, &LiveFrame::hello(channel_id.as_str()))
        .await
        .is_ok()
    {
        let period = Duration::from_millis(state.config.live.ping_interval_ms.max(1));
        let mut ping = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                biased;

                received = messages.recv() => {
                    let frame = match received {
                        Ok(entry) => LiveFrame::message(&entry),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(channel = %channel_id, skipped, "Live follower lagged");
                            LiveFrame::lagged(skipped)
                        }
                        Err(RecvError::Closed) => {
                            let _ = send_frame(&mut sender, &LiveFrame::error(1001, "Channel closed")).await;
                            break;
                        }
                    };
                    if send_frame(&mut sender, &frame).await.is_err() {
                        break;
                    }
                    if matches!(frame, LiveFrame::Message { .. }) {
                        metrics::record_live_delivery();
                    }
                }

                msg = receiver.next() => {
                    match msg {
                        Some(Ok(Message::Ping(data))) => {
                            if sender.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            debug!(channel = %channel_id, "Received close frame");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Followers only listen
                        }
                        Some(Err(e)) => {
                            warn!(channel = %channel_id, error = %e, "WebSocket error");
                            metrics::record_error("websocket");
                            break;
                        }
                        None => break,
                    }
                }

                _ = ping.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    state.relay.unfollow(&channel_id, messages);
    metrics::set_live_channels(state.relay.live_stats().channel_count);
    debug!(channel = %channel_id, "Live follower disconnected");
}

async fn send_frame(sender: &mut SplitSink<WebSocket, Message>, frame: &LiveFrame) -> Result<()> {
    let text = live::encode(frame)?;
    sender.send(Message::Text(text)).await?;
    Ok(())
}

//! WebSocket endpoint streaming job events to every connected client.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::broadcast::Subscription;
use crate::metrics;
use crate::state::AppState;

const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket endpoint. Clients only listen; anything they send is discarded.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    metrics::record_ws_connection();
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let Subscription { id, mut receiver } = state.subscribers.subscribe().await;
    metrics::set_ws_active_connections(state.subscribers.len().await);
    info!(subscriber = id, "WebSocket client connected");

    let (mut sender, mut incoming) = socket.split();

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    heartbeat.tick().await;

    loop {
        tokio::select! {
            text = receiver.recv() => {
                match text {
                    Some(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            debug!(subscriber = id, "Send failed, client disconnected");
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    debug!(subscriber = id, "Heartbeat failed, client disconnected");
                    break;
                }
            }
            client_msg = incoming.next() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {
                        metrics::record_ws_message_received();
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(subscriber = id, "WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    state.subscribers.unsubscribe(id).await;
    metrics::set_ws_active_connections(state.subscribers.len().await);
    info!(subscriber = id, "WebSocket client disconnected");
}

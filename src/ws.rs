//! WebSocket endpoints: upgrade, welcome, and the per-connection pump
//! between the registry outbox and the socket.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;

use crate::config::WsEndpoint;
use crate::registry::SubscriberHandle;
use crate::session::Session;
use crate::state::AppState;

/// WebSocket upgrade handler for `/ws/{group}`.
/// Unknown group segments are rejected before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(group): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(endpoint) = state.config.endpoint(&group) else {
        tracing::debug!("Rejecting WebSocket upgrade for unknown group '{}'", group);
        return StatusCode::NOT_FOUND.into_response();
    };
    let endpoint = endpoint.clone();

    tracing::info!("WebSocket connection request for group '{}'", endpoint.group);
    ws.on_upgrade(move |socket| handle_socket(socket, endpoint, state))
        .into_response()
}

/// Handle one connection: welcome, join, pump, teardown.
async fn handle_socket(socket: WebSocket, endpoint: WsEndpoint, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (handle, mut outbox) = SubscriberHandle::new();
    let mut session = Session::new(endpoint.group.clone(), handle);
    let conn = session.handle().id().to_string();

    if !session.open(&state.registry, &endpoint.welcome).await {
        tracing::error!("Failed to open session for group '{}'", endpoint.group);
        return;
    }
    tracing::info!("Connection {} joined '{}'", conn, endpoint.group);

    loop {
        tokio::select! {
            // Frames queued for this connection (welcome, then broadcasts)
            frame = outbox.recv() => {
                match frame {
                    Some(text) => {
                        if sender.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Client traffic only matters as a disconnect signal
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("Connection {} closed by client", conn);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error on {}: {}", conn, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Runs on every exit path, normal close and transport error alike
    session.close(&state.registry).await;
    tracing::info!("Connection {} left '{}'", conn, endpoint.group);
}

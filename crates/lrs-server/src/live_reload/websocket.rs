//! WebSocket handler for live reload.
//!
//! Each upgraded connection is registered immediately, then driven by a
//! [`ReloadProtocol`] fed from two sources: frames from the browser and
//! broadcasts queued through the registry.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;

use super::protocol::{Action, ChannelEvent, ReloadProtocol};
use super::registry::{ClientId, Outbound};
use crate::state::AppState;

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Drive an established livereload connection until it closes.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (id, mut outbound) = state.registry.register();
    let mut protocol = ReloadProtocol::new();
    tracing::debug!(client = %id, clients = state.registry.len(), "Livereload client connected");

    while !protocol.is_closed() {
        let action = tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => protocol.handle(ChannelEvent::Text(text.as_str())),
                Some(Ok(Message::Binary(_))) => protocol.handle(ChannelEvent::Unsupported("binary")),
                // Pings are answered by the transport.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => Action::None,
                Some(Ok(Message::Close(_))) | None => protocol.handle(ChannelEvent::Close),
                Some(Err(e)) => {
                    tracing::warn!(client = %id, error = %e, "Livereload socket closed with error");
                    protocol.handle(ChannelEvent::Error)
                }
            },
            queued = outbound.recv() => match queued {
                Some(Outbound::Message(message)) => protocol.handle(ChannelEvent::Broadcast(message)),
                Some(Outbound::Close) | None => protocol.handle(ChannelEvent::Shutdown),
            },
        };

        match action {
            Action::None => {}
            Action::Send(message) => {
                if let Err(e) = socket.send(Message::Text(message.to_json().into())).await {
                    tracing::debug!(client = %id, error = %e, "Failed to send to livereload client");
                    protocol.handle(ChannelEvent::Error);
                    teardown(&mut socket, &state, id).await;
                }
            }
            Action::Teardown => teardown(&mut socket, &state, id).await,
        }
    }

    tracing::debug!(client = %id, state = ?protocol.state(), "Livereload client disconnected");
}

/// Deregister the client and close its socket.
async fn teardown(socket: &mut WebSocket, state: &AppState, id: ClientId) {
    state.registry.remove(id);
    // The peer may already be gone; closing is best effort.
    let _ = socket.send(Message::Close(None)).await;
}

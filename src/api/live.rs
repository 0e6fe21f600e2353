//! WebSocket endpoint for live notifications.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};

use crate::notify::LiveHub;
use crate::AppState;

/// GET /ws - Upgrade to the live notification channel.
pub async fn ws_upgrade_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| serve_connection(socket, hub))
}

async fn serve_connection(mut socket: WebSocket, hub: LiveHub) {
    let mut subscription = hub.subscribe();
    let connection = subscription.id();
    tracing::debug!(connection, "Live client connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => hub.relay_client_frame(connection, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection, "Live socket error: {}", e);
                    break;
                }
            },
            outgoing = subscription.recv() => match outgoing {
                Some(payload) => {
                    if socket.send(Message::Text(payload.as_ref().into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    tracing::debug!(connection, "Live client disconnected");
}

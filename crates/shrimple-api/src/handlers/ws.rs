//! WebSocket upgrade handler and per-connection event loops.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use shrimple_core::types::id::UserId;

use crate::state::AppState;

/// Query parameters of the identity handshake.
///
/// The `userId` value was authenticated upstream; the core trusts it as-is.
/// A missing, empty, or unparsable value produces an anonymous connection.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Authenticated user identity, if any.
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// GET /ws?userId={uuid} — WebSocket upgrade.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Response {
    // The web client sends the literal string "undefined" when it has no
    // identity; treat it the same as an absent parameter.
    let user_id = query
        .user_id
        .as_deref()
        .filter(|value| !value.is_empty() && *value != "undefined")
        .and_then(|value| value.parse::<UserId>().ok());

    ws.on_upgrade(move |socket| handle_ws_connection(state, user_id, socket))
}

/// Drives an established WebSocket connection until it closes.
async fn handle_ws_connection(state: AppState, user_id: Option<UserId>, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state.realtime.connections.register(user_id);
    let conn_id = handle.id;

    info!(conn_id = %conn_id, user_id = ?user_id.map(|u| u.to_string()), "websocket connection established");

    // Forward outbound events to the socket in order. A handle closed
    // server-side (eviction, shutdown) gets a close frame so the client
    // observes it instead of idling on a dead connection.
    let forwarder_handle = handle.clone();
    let outbound_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                maybe_event = outbound_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "failed to serialize outbound event");
                            continue;
                        }
                    };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = forwarder_handle.closed() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            maybe_message = ws_rx.next() => {
                match maybe_message {
                    Some(Ok(Message::Text(text))) => {
                        state.realtime.connections.handle_inbound(&conn_id, &text);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(conn_id = %conn_id, error = %e, "websocket error");
                        break;
                    }
                }
            }
            _ = handle.closed() => break,
        }
    }

    state.realtime.connections.unregister(&conn_id);
    // Unregister marks the handle closed, which stops the forwarder; the
    // timeout bounds a send stuck on transport backpressure.
    let _ = tokio::time::timeout(std::time::Duration::from_secs(1), outbound_task).await;

    info!(conn_id = %conn_id, "websocket connection closed");
}

// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for the negotiation wire protocol.
//!
//! Client -> Server (JSON, tagged):
//! ```json
//! {"type": "join", "room_key": "room-v1-u1-1", "role": "buyer", ...}
//! {"type": "send_message", "room_key": "...", "role": "buyer", "text": "..."}
//! ```
//!
//! Server -> Client (JSON, tagged):
//! ```json
//! {"type": "room_state_sync", ...}
//! {"type": "new_message", ...}
//! {"type": "error", "code": "wrong_phase", "notice": "..."}
//! ```

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use sauda_core::events::{InboundEvent, OutboundEvent};
use sauda_core::SaudaError;
use sauda_room::ConnId;

use crate::server::GatewayState;

/// Outbound queue depth per connection; the broadcaster drops events on
/// overflow and the client recovers with a rejoin.
const OUTBOUND_CAPACITY: usize = 64;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection.
///
/// Spawns a sender task forwarding broadcaster events to the socket and
/// reads inbound frames in a loop, dispatching each to its room actor.
/// Dispatch failures become targeted `error` events; they never tear the
/// connection down.
async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let conn = ConnId(uuid::Uuid::new_v4().to_string());

    let broadcaster = state.dispatcher.broadcaster().clone();
    let (tx, mut rx) = mpsc::channel::<OutboundEvent>(OUTBOUND_CAPACITY);
    broadcaster.register(conn.clone(), tx);
    debug!(conn = %conn.0, "websocket connected");

    let sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "dropping unencodable outbound event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let event = match decode_event(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(conn = %conn.0, error = %e, "undecodable frame");
                        broadcaster.send_to(&conn, OutboundEvent::from_error(&e, None));
                        continue;
                    }
                };
                let room_key = event.room_key().cloned();
                if let Err(e) = state.dispatcher.dispatch(event, &conn).await {
                    debug!(conn = %conn.0, error = %e, "event rejected");
                    broadcaster.send_to(&conn, OutboundEvent::from_error(&e, room_key));
                }
            }
            Message::Close(_) => break,
            // Binary frames are not part of the protocol; ping/pong is
            // handled by the websocket layer.
            _ => {}
        }
    }

    broadcaster.disconnect(&conn);
    sender_task.abort();
    debug!(conn = %conn.0, "websocket disconnected");
}

fn decode_event(text: &str) -> Result<InboundEvent, SaudaError> {
    serde_json::from_str(text)
        .map_err(|e| SaudaError::InvalidRequest(format!("undecodable event: {e}")))
}

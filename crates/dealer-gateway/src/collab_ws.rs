//! `GET /api/ws/collaboration/:shopper_id` — the collaboration document
//! relay (spec §4.6).
//!
//! Authorization is coarse: any connection naming a room may join it.
//! The core fast-forwards a joiner with the room's accumulated history
//! and then relays every subsequent opaque update to the other
//! participants; it never inspects a byte of the payload.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use dealer_core::ShopperId;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::state::AppState;

pub async fn collab_ws_handler(
    ws: WebSocketUpgrade,
    Path(shopper_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ShopperId(shopper_id), state))
}

async fn handle_socket(socket: WebSocket, shopper_id: ShopperId, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let (participant_id, history) = state.rooms.join(&shopper_id, tx);
    for update in history {
        if ws_sender.send(Message::Binary(update)).await.is_err() {
            state.rooms.leave(&shopper_id, participant_id);
            return;
        }
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let rooms = state.rooms.clone();
    let room_id = shopper_id.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            match ws_receiver.next().await {
                Some(Ok(Message::Text(text))) => {
                    rooms.broadcast(&room_id, participant_id, text.into_bytes());
                }
                Some(Ok(Message::Binary(bytes))) => {
                    rooms.broadcast(&room_id, participant_id, bytes);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%err, "collaboration room websocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.rooms.leave(&shopper_id, participant_id);
}

//! `GET /api/ws/call` — the shopper's duplex channel (spec §4.4, §6).
//!
//! One socket, one sticky `shopperId`, established by the first
//! `join_queue` frame. Grounded on the split-socket / mpsc-forwarding /
//! dual-task pattern common across the pack's WebSocket handlers.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use dealer_core::{ShopperId, StoreError};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::queue_service;
use crate::state::AppState;
use crate::wire::{FrameError, ShopperInbound, ShopperOutbound};

pub async fn shopper_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    if ws_sender
        .send(Message::Text(
            serde_json::to_string(&ShopperOutbound::Connected {
                message: "connected".to_string(),
            })
            .unwrap_or_default()
            .into(),
        ))
        .await
        .is_err()
    {
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // The shopper's identity is not known until the first `join_queue`
    // frame arrives, so the per-connection id is tracked inside the
    // receive loop rather than threaded in from the upgrade.
    let recv_state = state.clone();
    let recv_tx = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut shopper_id: Option<ShopperId> = None;
        loop {
            match ws_receiver.next().await {
                Some(Ok(Message::Text(text))) => {
                    match crate::wire::parse_shopper_inbound(&text) {
                        Ok(frame) => {
                            shopper_id = handle_frame(&recv_state, &recv_tx, shopper_id, frame).await;
                        }
                        Err(FrameError::BadFrame) => {
                            debug!("malformed shopper frame");
                            queue_service::send_to(
                                &recv_tx,
                                &ShopperOutbound::Error {
                                    message: "Invalid message format".to_string(),
                                },
                            );
                        }
                        Err(FrameError::UnknownType(type_tag)) => {
                            warn!(%type_tag, "unrecognized shopper frame type");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%err, "shopper websocket receive error");
                    break;
                }
            }
        }
        shopper_id
    });

    let shopper_id = tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            None
        }
        result = &mut recv_task => {
            send_task.abort();
            result.unwrap_or(None)
        }
    };

    if let Some(shopper_id) = shopper_id {
        let now = Utc::now();
        state.store.mark_shopper_disconnected(&shopper_id, now);
        queue_service::publish_queue_update(&state.store, now);
        info!(%shopper_id, "shopper disconnected");
    }
}

/// Dispatch one parsed inbound frame, returning the connection's current
/// shopper identity (established or reaffirmed by `join_queue`).
pub(crate) async fn handle_frame(
    state: &AppState,
    tx: &mpsc::UnboundedSender<Message>,
    current: Option<ShopperId>,
    frame: ShopperInbound,
) -> Option<ShopperId> {
    let now = Utc::now();
    match frame {
        ShopperInbound::JoinQueue {
            shopper_id,
            media_capabilities,
        } => {
            let has_microphone = media_capabilities
                .get("hasAudioInput")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            state.store.upsert_shopper(
                shopper_id.clone(),
                tx.clone(),
                has_microphone,
                media_capabilities,
                now,
            );
            queue_service::notify_shopper_position(&state.store, &shopper_id, has_microphone);
            queue_service::publish_queue_update(&state.store, now);
            info!(%shopper_id, "shopper joined queue");
            Some(shopper_id)
        }
        ShopperInbound::LeaveQueue { shopper_id } => {
            state.store.remove_shopper(&shopper_id);
            queue_service::send_to_shopper(
                &state.store,
                &shopper_id,
                &ShopperOutbound::QueueLeft {
                    shopper_id: shopper_id.clone(),
                },
            );
            queue_service::publish_queue_update(&state.store, now);
            None
        }
        ShopperInbound::SdpAnswer {
            shopper_id,
            sdp_answer,
        } => {
            if let Some(rep_id) = state.store.get_shopper(&shopper_id).and_then(|e| e.assigned_rep_id) {
                queue_service::send_to_rep(
                    &state.store,
                    &rep_id,
                    &crate::wire::RepOutbound::SdpAnswer {
                        shopper_id: shopper_id.clone(),
                        sdp_answer,
                    },
                );
            } else {
                warn!(%shopper_id, "sdp_answer from unassigned shopper");
            }
            Some(shopper_id)
        }
        ShopperInbound::IceCandidate {
            shopper_id,
            ice_candidate,
        } => {
            if let Some(rep_id) = state.store.get_shopper(&shopper_id).and_then(|e| e.assigned_rep_id) {
                queue_service::send_to_rep(
                    &state.store,
                    &rep_id,
                    &crate::wire::RepOutbound::IceCandidate {
                        shopper_id: shopper_id.clone(),
                        ice_candidate,
                    },
                );
            }
            Some(shopper_id)
        }
        ShopperInbound::EndCall { shopper_id } => {
            if let Some((_, rep_id)) = state.store.release(&shopper_id) {
                state.store.end_collab(&shopper_id, &rep_id);
                queue_service::send_to_rep(
                    &state.store,
                    &rep_id,
                    &crate::wire::RepOutbound::CallEndedByShopper {
                        shopper_id: shopper_id.clone(),
                    },
                );
            }
            queue_service::send_to_shopper(
                &state.store,
                &shopper_id,
                &ShopperOutbound::CallEnded {
                    shopper_id: shopper_id.clone(),
                },
            );
            queue_service::publish_queue_update(&state.store, now);
            Some(shopper_id)
        }
        ShopperInbound::CollaborationResponse {
            shopper_id,
            sales_rep_id,
            accepted,
        } => {
            match state
                .store
                .respond_collab(&shopper_id, &sales_rep_id, accepted, now)
            {
                Ok(session) => {
                    queue_service::notify_collab_status(
                        &state.store,
                        &shopper_id,
                        &sales_rep_id,
                        session.status,
                    );
                }
                Err(err) => {
                    let store_err = StoreError::from(err);
                    queue_service::send_to_shopper(
                        &state.store,
                        &shopper_id,
                        &ShopperOutbound::Error {
                            message: store_err.to_string(),
                        },
                    );
                }
            }
            Some(shopper_id)
        }
    }
}

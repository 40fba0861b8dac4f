//! `GET /api/ws/calls/monitor` — the representative's duplex channel
//! (spec §4.4, §6).
//!
//! A representative's identity is established by the first `connect`
//! frame, at which point this connection subscribes to the store's
//! broadcast channel and starts forwarding `queue_update` snapshots
//! alongside its own request/response traffic.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use dealer_core::{RepId, StoreError};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::queue_service;
use crate::state::AppState;
use crate::wire::{FrameError, RepInbound, RepOutbound};

pub async fn rep_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    if ws_sender
        .send(Message::Text(
            serde_json::to_string(&RepOutbound::Connected {
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

    let broadcast_tx = tx.clone();
    let mut broadcast_rx = state.store.subscribe();
    let mut broadcast_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(queue) => {
                    queue_service::send_to(
                        &broadcast_tx,
                        &RepOutbound::QueueUpdate {
                            queue: (*queue).clone(),
                        },
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let recv_state = state.clone();
    let recv_tx = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut rep_id: Option<RepId> = None;
        loop {
            match ws_receiver.next().await {
                Some(Ok(Message::Text(text))) => match crate::wire::parse_rep_inbound(&text) {
                    Ok(frame) => {
                        rep_id = handle_frame(&recv_state, &recv_tx, rep_id, frame).await;
                    }
                    Err(FrameError::BadFrame) => {
                        debug!("malformed representative frame");
                        queue_service::send_to(
                            &recv_tx,
                            &RepOutbound::Error {
                                message: "Invalid message format".to_string(),
                            },
                        );
                    }
                    Err(FrameError::UnknownType(type_tag)) => {
                        warn!(%type_tag, "unrecognized representative frame type");
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%err, "representative websocket receive error");
                    break;
                }
            }
        }
        rep_id
    });

    let rep_id = tokio::select! {
        _ = &mut send_task => {
            broadcast_task.abort();
            recv_task.abort();
            None
        }
        _ = &mut broadcast_task => {
            send_task.abort();
            recv_task.abort();
            None
        }
        result = &mut recv_task => {
            send_task.abort();
            broadcast_task.abort();
            result.unwrap_or(None)
        }
    };

    if let Some(rep_id) = rep_id {
        state.store.unregister_rep(&rep_id);
        info!(%rep_id, "representative disconnected");
    }
}

pub(crate) async fn handle_frame(
    state: &AppState,
    tx: &mpsc::UnboundedSender<Message>,
    current: Option<RepId>,
    frame: RepInbound,
) -> Option<RepId> {
    let now = Utc::now();
    match frame {
        RepInbound::Connect { sales_rep_id } => {
            state.store.register_rep(sales_rep_id.clone(), tx.clone(), now);
            queue_service::send_to(
                tx,
                &RepOutbound::QueueUpdate {
                    queue: state.store.snapshot_queue(now),
                },
            );
            info!(rep_id = %sales_rep_id, "representative connected");
            Some(sales_rep_id)
        }
        RepInbound::ClaimCall {
            sales_rep_id,
            shopper_id,
            sdp_offer,
        } => {
            match state.store.assign(&shopper_id, &sales_rep_id) {
                Ok(_) => {
                    queue_service::send_to(
                        tx,
                        &RepOutbound::CallClaimed {
                            shopper_id: shopper_id.clone(),
                            message: "call claimed".to_string(),
                        },
                    );
                    queue_service::send_to_shopper(
                        &state.store,
                        &shopper_id,
                        &crate::wire::ShopperOutbound::CallAnswered {
                            sales_rep_id: sales_rep_id.clone(),
                            message: "a representative has joined your call".to_string(),
                            sdp_offer,
                        },
                    );
                    queue_service::publish_queue_update(&state.store, now);
                }
                Err(err) => {
                    let store_err = StoreError::from(err);
                    queue_service::send_to(
                        tx,
                        &RepOutbound::Error {
                            message: store_err.to_string(),
                        },
                    );
                }
            }
            Some(current.unwrap_or(sales_rep_id))
        }
        RepInbound::ReleaseCall {
            sales_rep_id,
            shopper_id,
        } => {
            match state.store.get_shopper(&shopper_id) {
                Some(entry) if entry.assigned_rep_id.as_ref() == Some(&sales_rep_id) => {
                    state.store.release(&shopper_id);
                    state.store.end_collab(&shopper_id, &sales_rep_id);
                    let position = state.store.position_of(&shopper_id);
                    queue_service::send_to_shopper(
                        &state.store,
                        &shopper_id,
                        &crate::wire::ShopperOutbound::CallReleased {
                            previous_sales_rep_id: sales_rep_id.clone(),
                            position,
                            message: "the representative ended the call".to_string(),
                        },
                    );
                    queue_service::send_to(
                        tx,
                        &RepOutbound::CallReleased {
                            shopper_id: shopper_id.clone(),
                            message: "call released".to_string(),
                        },
                    );
                    queue_service::publish_queue_update(&state.store, now);
                }
                _ => {
                    queue_service::send_to(
                        tx,
                        &RepOutbound::Error {
                            message: StoreError::Unauthorized {
                                actor: sales_rep_id.to_string(),
                                shopper: shopper_id.clone(),
                            }
                            .to_string(),
                        },
                    );
                }
            }
            Some(current.unwrap_or(sales_rep_id))
        }
        RepInbound::IceCandidate {
            sales_rep_id,
            shopper_id,
            ice_candidate,
        } => {
            match state.store.get_shopper(&shopper_id) {
                Some(entry) if entry.assigned_rep_id.as_ref() == Some(&sales_rep_id) => {
                    queue_service::send_to_shopper(
                        &state.store,
                        &shopper_id,
                        &crate::wire::ShopperOutbound::IceCandidate {
                            sales_rep_id: sales_rep_id.clone(),
                            ice_candidate,
                        },
                    );
                }
                _ => {
                    queue_service::send_to(
                        tx,
                        &RepOutbound::Error {
                            message: StoreError::Unauthorized {
                                actor: sales_rep_id.to_string(),
                                shopper: shopper_id.clone(),
                            }
                            .to_string(),
                        },
                    );
                }
            }
            Some(current.unwrap_or(sales_rep_id))
        }
        RepInbound::RequestCollaboration {
            sales_rep_id,
            shopper_id,
        } => {
            match state.store.request_collab(&shopper_id, &sales_rep_id, now) {
                Ok(_) => {
                    queue_service::send_to_shopper(
                        &state.store,
                        &shopper_id,
                        &crate::wire::ShopperOutbound::CollaborationRequest {
                            sales_rep_id: sales_rep_id.clone(),
                            sales_rep_name: sales_rep_id.to_string(),
                        },
                    );
                }
                Err(err) => {
                    let store_err = StoreError::from(err);
                    queue_service::send_to(
                        tx,
                        &RepOutbound::Error {
                            message: store_err.to_string(),
                        },
                    );
                }
            }
            Some(current.unwrap_or(sales_rep_id))
        }
    }
}

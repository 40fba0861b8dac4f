//! The queue service façade (spec §4.2): the only place that turns a
//! store mutation into wire frames and pushes them down live connections.
//!
//! Every function here takes the store, does one logical operation, and
//! fans the result out to whichever sockets need to hear about it. None
//! of this is reusable by `dealer-store` itself, since it depends on
//! `axum`'s `Message` type — that's the line this crate exists to draw.

use std::sync::Arc;

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use dealer_core::{CollabStatus, RepId, ShopperId};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::state::Store;
use crate::wire::{RepOutbound, ShopperOutbound};

/// Serialize a frame and push it down a connection handle.
///
/// A send failure only means the client's receive loop has already torn
/// the socket down; it is logged and otherwise ignored; the janitor and
/// the handler's own disconnect path are what actually clean up state.
pub fn send_to<T: Serialize>(tx: &mpsc::UnboundedSender<Message>, frame: &T) {
    match serde_json::to_string(frame) {
        Ok(text) => {
            if tx.send(Message::Text(text.into())).is_err() {
                warn!("dropped outbound frame: receiver gone");
            }
        }
        Err(err) => warn!(%err, "failed to serialize outbound frame"),
    }
}

/// Send one frame to a shopper, if the handle is still registered.
pub fn send_to_shopper(store: &Store, shopper_id: &ShopperId, frame: &ShopperOutbound) {
    if let Some(conn) = store.shopper_conn(shopper_id) {
        send_to(&conn, frame);
    }
}

/// Send one frame to a representative, if the handle is still registered.
pub fn send_to_rep(store: &Store, rep_id: &RepId, frame: &RepOutbound) {
    if let Some(conn) = store.rep_conn(rep_id) {
        send_to(&conn, frame);
    }
}

/// Recompute the queue snapshot and push a `queue_update` to every
/// representative connection, using the store's broadcast channel (spec
/// §4.5). Individual representative handlers subscribe at connect time;
/// this just triggers the send.
pub fn publish_queue_update(store: &Store, now: DateTime<Utc>) -> Arc<Vec<dealer_core::QueueSummary>> {
    store.broadcast_snapshot(now)
}

/// Notify a shopper of their place in line after a join or release (spec
/// §4.4 `queue_joined` / `call_released`).
pub fn notify_shopper_position(store: &Store, shopper_id: &ShopperId, has_microphone: bool) {
    let position = store.position_of(shopper_id);
    send_to_shopper(
        store,
        shopper_id,
        &ShopperOutbound::QueueJoined {
            shopper_id: shopper_id.clone(),
            position,
            has_microphone,
        },
    );
}

/// Notify both sides of a collaboration status change (spec §4.6).
pub fn notify_collab_status(
    store: &Store,
    shopper_id: &ShopperId,
    rep_id: &RepId,
    status: CollabStatus,
) {
    send_to_shopper(
        store,
        shopper_id,
        &ShopperOutbound::CollaborationStatus { status },
    );
    send_to_rep(store, rep_id, &RepOutbound::CollaborationStatus { status });
}

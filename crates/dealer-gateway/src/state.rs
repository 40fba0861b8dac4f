//! Shared application state threaded through every axum handler.

use std::sync::Arc;

use axum::extract::ws::Message;
use dealer_config::Config;
use dealer_store::StateStore;
use tokio::sync::mpsc;

use crate::collab_rooms::CollabRooms;

/// Outbound half of one shopper's socket: frames pushed here are forwarded
/// to the client by that connection's send task (see `shopper_ws`).
pub type ShopperConn = mpsc::UnboundedSender<Message>;

/// Outbound half of one representative's socket.
pub type RepConn = mpsc::UnboundedSender<Message>;

/// The store, specialized to this gateway's connection handle types.
pub type Store = StateStore<ShopperConn, RepConn>;

/// Cloned into every handler via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<Config>,
    pub rooms: Arc<CollabRooms>,
    pub chat: Arc<crate::rest::ChatThreads>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let store = Arc::new(Store::new(config.broadcast_capacity));
        Self {
            store,
            config: Arc::new(config),
            rooms: Arc::new(CollabRooms::new()),
            chat: Arc::new(crate::rest::ChatThreads::new()),
        }
    }
}

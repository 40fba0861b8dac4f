//! WebSocket and HTTP transport for the dealership call coordination
//! backend (spec §4.3–§4.7, §6).
//!
//! This crate owns everything that knows about the wire: frame shapes,
//! the axum router, the three duplex endpoints, the REST fixtures, and
//! the janitor. Domain state and its invariants live one layer down in
//! [`dealer_store`]; this crate never reimplements them.

#![deny(unsafe_code)]
#![warn(clippy::all)]

mod collab_rooms;
mod collab_ws;
#[cfg(test)]
mod e2e_tests;
mod janitor;
mod queue_service;
mod rep_ws;
mod rest;
pub mod server;
mod shopper_ws;
mod state;
mod wire;

pub use janitor::JanitorHandle;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the full router: three WebSocket upgrades under `/api`, plus the
/// two REST fixtures (spec §6).
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ws/call", get(shopper_ws::shopper_ws_handler))
        .route("/api/ws/calls/monitor", get(rep_ws::rep_ws_handler))
        .route(
            "/api/ws/collaboration/:shopper_id",
            get(collab_ws::collab_ws_handler),
        )
        .route("/api/cars", get(rest::list_cars))
        .route("/api/chat", post(rest::chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Core domain types for the dealership call coordination backend.
//!
//! This crate has no dependency on the transport layer (no `axum`, no
//! `tokio`): it defines the identifiers, entity shapes, and error types
//! that the store and gateway crates share. Conversion to and from wire
//! frames happens at the gateway boundary.

#![deny(unsafe_code)]
#![warn(clippy::all)]

mod ids;
mod queue;
mod shopper;
mod rep;
mod collab;
mod error;

pub use collab::{CollabSession, CollabStatus};
pub use error::{AssignError, CollabError, StoreError};
pub use ids::{RepId, ShopperId};
pub use queue::QueueSummary;
pub use rep::RepConnection;
pub use shopper::{MediaCapabilities, ShopperEntry};

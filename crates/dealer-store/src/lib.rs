//! The authoritative in-memory state store and the pure queue operations
//! built on top of it (spec §4.1, §4.2).
//!
//! The store is transport-agnostic: it is generic over the connection
//! handle types the gateway crate uses to reach a shopper (`SC`) and a
//! representative (`RC`). It never constructs or sends a wire frame —
//! that is the gateway's `QueueService`'s job, built one layer up.
//!
//! # Locking
//!
//! A single `std::sync::Mutex` guards the three tables (shoppers, reps,
//! collaboration sessions). Every public method takes the lock once,
//! mutates, and releases it before returning — there is no `.await`
//! anywhere inside a critical section, so a synchronous `Mutex` is the
//! right tool, not `tokio::sync::Mutex` (spec §5: "no component caches a
//! reference to an entry across suspension points").

#![deny(unsafe_code)]
#![warn(clippy::all)]

mod snapshot;
mod store;

pub use store::StateStore;

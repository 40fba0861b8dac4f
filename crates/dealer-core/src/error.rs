use thiserror::Error;

use crate::ids::{RepId, ShopperId};

/// Failure modes of [`StoreError`] assignment and lookup operations.
///
/// Mirrors spec §4.1's `assign` contract: exactly one of these three
/// reasons, never a bare string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignError {
    /// The shopper entry does not exist (never joined, or already removed).
    #[error("shopper not found: {0}")]
    ShopperNotFound(ShopperId),
    /// The shopper is already assigned to a different representative.
    #[error("shopper {shopper} already claimed by {by}")]
    AlreadyClaimed {
        /// The shopper in question.
        shopper: ShopperId,
        /// The representative that already holds the claim.
        by: RepId,
    },
    /// The claiming representative already has a different shopper assigned.
    #[error("representative {0} is already busy")]
    RepBusy(RepId),
}

/// Failure modes of the collaboration handshake.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollabError {
    /// The (shopper, rep) pair is not currently an assigned call.
    #[error("shopper {shopper} is not currently assigned to {rep}")]
    NotAssigned {
        /// The shopper side of the pair.
        shopper: ShopperId,
        /// The representative side of the pair.
        rep: RepId,
    },
    /// A request was made while a `pending` session for the pair still exists.
    #[error("a collaboration request for {shopper} and {rep} is already pending")]
    AlreadyPending {
        /// The shopper side of the pair.
        shopper: ShopperId,
        /// The representative side of the pair.
        rep: RepId,
    },
    /// A response was sent but no `pending` session exists for the pair.
    #[error("no pending collaboration request for {shopper} and {rep}")]
    NoPendingRequest {
        /// The shopper side of the pair.
        shopper: ShopperId,
        /// The representative side of the pair.
        rep: RepId,
    },
}

/// Errors surfaced by the store's lookup and mutation operations.
///
/// These are the typed causes behind the wire-level `error` frame kinds in
/// spec §7 (`NotFound`, `AlreadyClaimed`, `RepBusy`, `Unauthorized`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Wraps an [`AssignError`].
    #[error(transparent)]
    Assign(#[from] AssignError),
    /// Wraps a [`CollabError`].
    #[error(transparent)]
    Collab(#[from] CollabError),
    /// Referenced shopper entry does not exist.
    #[error("shopper not found: {0}")]
    ShopperNotFound(ShopperId),
    /// Referenced representative is not registered.
    #[error("representative not found: {0}")]
    RepNotFound(RepId),
    /// The caller does not own the call it is trying to signal into.
    #[error("{actor} is not authorized to signal for shopper {shopper}")]
    Unauthorized {
        /// The actor that attempted the operation.
        actor: String,
        /// The shopper the actor tried to signal for.
        shopper: ShopperId,
    },
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RepId, ShopperId};

/// Status of a collaboration handshake between one shopper and one
/// representative. See spec §3 for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollabStatus {
    /// Requested by the representative, awaiting the shopper's response.
    Pending,
    /// The shopper accepted; both sides may connect to the document room.
    Accepted,
    /// The shopper declined.
    Rejected,
    /// The call that hosted this session was released, or a participant
    /// left, or the TTL on a `Pending` session expired without a response
    /// (an expired `Pending` session is deleted outright rather than kept
    /// as `Ended`, by the janitor's sweep).
    Ended,
}

/// One collaboration session, keyed by the (representative, shopper) pair
/// that requested it. A new request after a terminal state creates a new
/// session with the same key (spec §3, invariant I5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollabSession {
    /// The shopper side of the pair.
    pub shopper_id: ShopperId,
    /// The representative side of the pair.
    pub rep_id: RepId,
    /// Current state.
    pub status: CollabStatus,
    /// When the request was made.
    pub requested_at: DateTime<Utc>,
    /// When the shopper responded, if they have.
    pub responded_at: Option<DateTime<Utc>>,
}

impl CollabSession {
    /// Create a freshly requested, `Pending` session.
    #[must_use]
    pub fn requested(shopper_id: ShopperId, rep_id: RepId, now: DateTime<Utc>) -> Self {
        Self {
            shopper_id,
            rep_id,
            status: CollabStatus::Pending,
            requested_at: now,
            responded_at: None,
        }
    }
}

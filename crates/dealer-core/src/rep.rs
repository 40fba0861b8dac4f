use chrono::{DateTime, Utc};

use crate::ids::RepId;

/// A currently-connected representative.
///
/// Lives only while the representative's WebSocket connection is open;
/// destroyed on disconnect. The generic `Conn` parameter lets the store
/// stay agnostic of the transport's connection-handle type (a `Sender`
/// half of the socket, supplied by the gateway crate).
#[derive(Debug, Clone)]
pub struct RepConnection<Conn> {
    /// Primary key.
    pub rep_id: RepId,
    /// Handle used to push frames to this representative.
    pub conn: Conn,
    /// When this representative connected.
    pub connected_at: DateTime<Utc>,
}

impl<Conn> RepConnection<Conn> {
    /// Create a new representative connection record.
    #[must_use]
    pub fn new(rep_id: RepId, conn: Conn, now: DateTime<Utc>) -> Self {
        Self {
            rep_id,
            conn,
            connected_at: now,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RepId, ShopperId};
use crate::shopper::ShopperEntry;

/// A point-in-time, connection-stripped projection of one shopper entry,
/// suitable for serialization into a `queue_update` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    /// The shopper this summary describes.
    pub shopper_id: ShopperId,
    /// First-seen timestamp, in epoch milliseconds.
    pub connected_at: i64,
    /// Most recent disconnect timestamp, in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnected_at: Option<i64>,
    /// Whether the shopper is currently connected.
    pub is_connected: bool,
    /// Seconds since `disconnected_at`, computed at snapshot time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_since_disconnected_seconds: Option<i64>,
    /// The representative currently handling this shopper, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_rep_id: Option<RepId>,
    /// Whether the shopper reported having a microphone.
    pub has_microphone: bool,
}

impl QueueSummary {
    /// Project a stored entry into its public, connection-stripped shape.
    #[must_use]
    pub fn from_entry(entry: &ShopperEntry, now: DateTime<Utc>) -> Self {
        let time_since_disconnected_seconds = entry
            .disconnected_at
            .map(|at| (now - at).num_seconds().max(0));

        Self {
            shopper_id: entry.shopper_id.clone(),
            connected_at: entry.connected_at.timestamp_millis(),
            disconnected_at: entry.disconnected_at.map(|at| at.timestamp_millis()),
            is_connected: entry.is_connected,
            time_since_disconnected_seconds,
            assigned_rep_id: entry.assigned_rep_id.clone(),
            has_microphone: entry.has_microphone,
        }
    }
}

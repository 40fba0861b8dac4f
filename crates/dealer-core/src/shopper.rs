use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{RepId, ShopperId};

/// Opaque media-capability record forwarded verbatim with `join_queue`.
///
/// The shape is client-defined (e.g. `{hasAudioInput, hasVideoInput, ...}`);
/// the core only stores and echoes it, it never inspects fields other than
/// `hasMicrophone`, which is tracked separately on [`ShopperEntry`].
pub type MediaCapabilities = Value;

/// One shopper entry, created on first join and retained for the process
/// lifetime (or until explicit leave / janitor eviction).
///
/// Invariants (see spec §3):
/// - `is_connected` true implies `disconnected_at` is `None`, and vice versa.
/// - `connected_at` is set once at creation and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopperEntry {
    /// Primary key.
    pub shopper_id: ShopperId,
    /// First-seen timestamp; stable across reconnects.
    pub connected_at: DateTime<Utc>,
    /// Timestamp of the most recent disconnect, if currently disconnected.
    pub disconnected_at: Option<DateTime<Utc>>,
    /// Whether the shopper currently has a live connection.
    pub is_connected: bool,
    /// The representative currently handling this shopper, if any.
    pub assigned_rep_id: Option<RepId>,
    /// Whether the shopper reported having a microphone on join.
    pub has_microphone: bool,
    /// Opaque capability record from the join frame.
    pub media_capabilities: MediaCapabilities,
}

impl ShopperEntry {
    /// Create a fresh entry for a shopper seen for the first time.
    #[must_use]
    pub fn new(
        shopper_id: ShopperId,
        now: DateTime<Utc>,
        has_microphone: bool,
        media_capabilities: MediaCapabilities,
    ) -> Self {
        Self {
            shopper_id,
            connected_at: now,
            disconnected_at: None,
            is_connected: true,
            assigned_rep_id: None,
            has_microphone,
            media_capabilities,
        }
    }
}

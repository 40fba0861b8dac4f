use chrono::{DateTime, Utc};

use dealer_core::{QueueSummary, ShopperEntry, ShopperId};

/// Sort entries by `connected_at` ascending, then by id for a total order
/// (entries can share a millisecond timestamp under concurrent joins).
///
/// `connected_at` is never rewritten after creation (spec §3, invariant
/// I4), so sorting by it yields a stable arrival order across snapshots
/// even as shoppers reconnect, disconnect, or get assigned.
pub(crate) fn sort_by_arrival(entries: &mut [&ShopperEntry]) {
    entries.sort_by(|a, b| {
        a.connected_at
            .cmp(&b.connected_at)
            .then_with(|| a.shopper_id.cmp(&b.shopper_id))
    });
}

/// Project a set of entries, already known to be in display order, into
/// the wire-ready [`QueueSummary`] list.
pub(crate) fn project(entries: &[&ShopperEntry], now: DateTime<Utc>) -> Vec<QueueSummary> {
    entries
        .iter()
        .map(|entry| QueueSummary::from_entry(entry, now))
        .collect()
}

/// 1-based rank of `shopper_id` among the waiting line (currently
/// connected, unassigned entries, sorted by arrival), or `0` if the
/// shopper is not a member of that set (spec §4.1 `positionOf`).
pub(crate) fn position_of(waiting_line: &[&ShopperEntry], shopper_id: &ShopperId) -> usize {
    waiting_line
        .iter()
        .position(|entry| &entry.shopper_id == shopper_id)
        .map_or(0, |idx| idx + 1)
}

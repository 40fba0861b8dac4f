use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dealer_core::{
    AssignError, CollabError, CollabSession, CollabStatus, QueueSummary, RepConnection, RepId,
    ShopperEntry, ShopperId,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::snapshot;

/// A shopper entry plus the (possibly absent) handle used to reach it.
///
/// The connection handle is kept out of [`ShopperEntry`] itself so that
/// the core crate stays serializable and transport-agnostic; the store is
/// the only place the two are joined.
struct ShopperRecord<SC> {
    entry: ShopperEntry,
    conn: Option<SC>,
}

struct Inner<SC, RC> {
    shoppers: HashMap<ShopperId, ShopperRecord<SC>>,
    reps: HashMap<RepId, RepConnection<RC>>,
    collab: HashMap<(RepId, ShopperId), CollabSession>,
}

/// The single authoritative registry of shopper entries, representative
/// connections, and collaboration sessions (spec §4.1).
///
/// `SC` and `RC` are the gateway's shopper- and representative-connection
/// handle types, respectively; the store never inspects them beyond
/// cloning and handing them back out.
pub struct StateStore<SC, RC> {
    inner: Mutex<Inner<SC, RC>>,
    broadcast_tx: broadcast::Sender<Arc<Vec<QueueSummary>>>,
}

impl<SC, RC> StateStore<SC, RC> {
    /// Create an empty store with the given broadcast channel capacity
    /// (spec §6's `BROADCAST_CAPACITY`; a slow or absent subscriber simply
    /// misses or lags, per spec §4.5).
    #[must_use]
    pub fn new(broadcast_capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(broadcast_capacity);
        Self {
            inner: Mutex::new(Inner {
                shoppers: HashMap::new(),
                reps: HashMap::new(),
                collab: HashMap::new(),
            }),
            broadcast_tx,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<SC, RC>> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Subscribe to `queue_update` snapshots. Every representative
    /// connection calls this once, at `connect` time (spec §4.4).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Vec<QueueSummary>>> {
        self.broadcast_tx.subscribe()
    }

    /// Compute the current snapshot and push it to every subscriber.
    ///
    /// Called after every store mutation that changes the observable
    /// queue (spec §4.5). Returns the snapshot that was sent, so callers
    /// that also need it (e.g. a fresh representative's initial push)
    /// don't recompute it.
    pub fn broadcast_snapshot(&self, now: DateTime<Utc>) -> Arc<Vec<QueueSummary>> {
        let snapshot = Arc::new(self.snapshot_queue(now));
        // No receivers is not an error: representatives may simply not be
        // connected yet (spec §4.5 — best-effort, sends are never retried).
        let _ = self.broadcast_tx.send(Arc::clone(&snapshot));
        snapshot
    }

    // ---------------------------------------------------------------
    // Shopper entries
    // ---------------------------------------------------------------

    /// Create or reconnect a shopper entry (spec §4.1 `upsertShopper`).
    ///
    /// On reconnect, `connected_at` is never touched (invariant I4);
    /// `assigned_rep_id` is left untouched too — reconnecting does not
    /// implicitly release a call.
    pub fn upsert_shopper(
        &self,
        shopper_id: ShopperId,
        conn: SC,
        has_microphone: bool,
        media_capabilities: Value,
        now: DateTime<Utc>,
    ) -> ShopperEntry {
        let mut inner = self.lock();
        match inner.shoppers.get_mut(&shopper_id) {
            Some(record) => {
                record.conn = Some(conn);
                record.entry.is_connected = true;
                record.entry.disconnected_at = None;
                record.entry.has_microphone = has_microphone;
                record.entry.media_capabilities = media_capabilities;
                record.entry.clone()
            }
            None => {
                let entry = ShopperEntry::new(shopper_id.clone(), now, has_microphone, media_capabilities);
                let record = ShopperRecord {
                    entry: entry.clone(),
                    conn: Some(conn),
                };
                inner.shoppers.insert(shopper_id, record);
                entry
            }
        }
    }

    /// Mark a shopper disconnected without removing the entry (spec §4.1
    /// `markShopperDisconnected`). Does not clear `assigned_rep_id` — a
    /// disconnect is not a release (spec §9 open question).
    pub fn mark_shopper_disconnected(
        &self,
        shopper_id: &ShopperId,
        now: DateTime<Utc>,
    ) -> Option<ShopperEntry> {
        let mut inner = self.lock();
        let record = inner.shoppers.get_mut(shopper_id)?;
        record.entry.is_connected = false;
        record.entry.disconnected_at = Some(now);
        record.conn = None;
        Some(record.entry.clone())
    }

    /// Delete a shopper entry outright (spec §4.1 `removeShopper`). The
    /// caller is responsible for transitioning any related collaboration
    /// session to `ended` (spec §3) — use [`Self::end_collab`].
    pub fn remove_shopper(&self, shopper_id: &ShopperId) -> bool {
        self.lock().shoppers.remove(shopper_id).is_some()
    }

    /// Clone out the entry's connection handle, if the shopper is
    /// currently connected.
    pub fn shopper_conn(&self, shopper_id: &ShopperId) -> Option<SC>
    where
        SC: Clone,
    {
        self.lock().shoppers.get(shopper_id)?.conn.clone()
    }

    /// Clone out a shopper's current public entry, if it exists.
    pub fn get_shopper(&self, shopper_id: &ShopperId) -> Option<ShopperEntry> {
        self.lock().shoppers.get(shopper_id).map(|r| r.entry.clone())
    }

    // ---------------------------------------------------------------
    // Representative connections
    // ---------------------------------------------------------------

    /// Register a newly connected representative (spec §4.1 `registerRep`).
    pub fn register_rep(&self, rep_id: RepId, conn: RC, now: DateTime<Utc>) {
        self.lock()
            .reps
            .insert(rep_id.clone(), RepConnection::new(rep_id, conn, now));
    }

    /// Remove a representative's connection record. Any shopper still
    /// pointing at this rep via `assigned_rep_id` keeps the assignment —
    /// that is an acknowledged open question, not swept here (spec §4.4,
    /// §9).
    pub fn unregister_rep(&self, rep_id: &RepId) -> bool {
        self.lock().reps.remove(rep_id).is_some()
    }

    /// Clone out a representative's connection handle, if registered.
    pub fn rep_conn(&self, rep_id: &RepId) -> Option<RC>
    where
        RC: Clone,
    {
        self.lock().reps.get(rep_id).map(|r| r.conn.clone())
    }

    /// The shopper this representative currently has assigned, if any
    /// (spec §4.1 `getRepBusy`; linear scan, acceptable per spec §4.1).
    pub fn get_rep_busy(&self, rep_id: &RepId) -> Option<ShopperId> {
        self.lock()
            .shoppers
            .values()
            .find(|record| record.entry.assigned_rep_id.as_ref() == Some(rep_id))
            .map(|record| record.entry.shopper_id.clone())
    }

    // ---------------------------------------------------------------
    // Assignment
    // ---------------------------------------------------------------

    /// Claim a shopper for a representative (spec §4.1 `assign`).
    ///
    /// # Errors
    ///
    /// - [`AssignError::ShopperNotFound`] if the shopper entry doesn't exist.
    /// - [`AssignError::AlreadyClaimed`] if a different rep already owns it.
    /// - [`AssignError::RepBusy`] if `rep_id` already has a different shopper.
    pub fn assign(&self, shopper_id: &ShopperId, rep_id: &RepId) -> Result<ShopperEntry, AssignError> {
        let mut inner = self.lock();

        let already_busy_with = inner
            .shoppers
            .values()
            .find(|r| r.entry.assigned_rep_id.as_ref() == Some(rep_id))
            .map(|r| r.entry.shopper_id.clone());
        if let Some(busy_with) = already_busy_with {
            if &busy_with != shopper_id {
                debug!(%rep_id, busy_with = %busy_with, "assign rejected: representative busy");
                return Err(AssignError::RepBusy(rep_id.clone()));
            }
        }

        let record = inner
            .shoppers
            .get_mut(shopper_id)
            .ok_or_else(|| AssignError::ShopperNotFound(shopper_id.clone()))?;

        if let Some(existing) = &record.entry.assigned_rep_id {
            if existing != rep_id {
                return Err(AssignError::AlreadyClaimed {
                    shopper: shopper_id.clone(),
                    by: existing.clone(),
                });
            }
        }

        record.entry.assigned_rep_id = Some(rep_id.clone());
        Ok(record.entry.clone())
    }

    /// Release a shopper's assignment (spec §4.1 `release`). Returns the
    /// updated entry and the previous rep id, so the caller can fabricate
    /// the downstream notification.
    pub fn release(&self, shopper_id: &ShopperId) -> Option<(ShopperEntry, RepId)> {
        let mut inner = self.lock();
        let record = inner.shoppers.get_mut(shopper_id)?;
        let previous = record.entry.assigned_rep_id.take()?;
        Some((record.entry.clone(), previous))
    }

    // ---------------------------------------------------------------
    // Snapshot & position
    // ---------------------------------------------------------------

    /// Derive the full public projection of every shopper entry, in
    /// stable arrival order (spec §4.1 `snapshotQueue`).
    #[must_use]
    pub fn snapshot_queue(&self, now: DateTime<Utc>) -> Vec<QueueSummary> {
        let inner = self.lock();
        let mut entries: Vec<&ShopperEntry> = inner.shoppers.values().map(|r| &r.entry).collect();
        snapshot::sort_by_arrival(&mut entries);
        snapshot::project(&entries, now)
    }

    /// 1-based rank in the waiting line (currently connected, unassigned,
    /// ordered by arrival), or `0` if not a member (spec §4.1 `positionOf`).
    #[must_use]
    pub fn position_of(&self, shopper_id: &ShopperId) -> usize {
        let inner = self.lock();
        let mut waiting: Vec<&ShopperEntry> = inner
            .shoppers
            .values()
            .map(|r| &r.entry)
            .filter(|e| e.is_connected && e.assigned_rep_id.is_none())
            .collect();
        snapshot::sort_by_arrival(&mut waiting);
        snapshot::position_of(&waiting, shopper_id)
    }

    // ---------------------------------------------------------------
    // Collaboration sessions
    // ---------------------------------------------------------------

    /// Request a collaboration session for a currently-assigned pair
    /// (spec §4.1 `requestCollab`).
    ///
    /// # Errors
    ///
    /// - [`CollabError::NotAssigned`] if the pair isn't the current call.
    /// - [`CollabError::AlreadyPending`] if a `pending` session already
    ///   exists for this key.
    pub fn request_collab(
        &self,
        shopper_id: &ShopperId,
        rep_id: &RepId,
        now: DateTime<Utc>,
    ) -> Result<CollabSession, CollabError> {
        let mut inner = self.lock();

        let assigned = inner
            .shoppers
            .get(shopper_id)
            .is_some_and(|r| r.entry.assigned_rep_id.as_ref() == Some(rep_id));
        if !assigned {
            return Err(CollabError::NotAssigned {
                shopper: shopper_id.clone(),
                rep: rep_id.clone(),
            });
        }

        let key = (rep_id.clone(), shopper_id.clone());
        if let Some(existing) = inner.collab.get(&key) {
            if existing.status == CollabStatus::Pending {
                return Err(CollabError::AlreadyPending {
                    shopper: shopper_id.clone(),
                    rep: rep_id.clone(),
                });
            }
        }

        let session = CollabSession::requested(shopper_id.clone(), rep_id.clone(), now);
        inner.collab.insert(key, session.clone());
        Ok(session)
    }

    /// Resolve a pending request (spec §4.1 `respondCollab`).
    ///
    /// # Errors
    ///
    /// [`CollabError::NoPendingRequest`] if no `pending` session exists
    /// for this pair.
    pub fn respond_collab(
        &self,
        shopper_id: &ShopperId,
        rep_id: &RepId,
        accepted: bool,
        now: DateTime<Utc>,
    ) -> Result<CollabSession, CollabError> {
        let mut inner = self.lock();
        let key = (rep_id.clone(), shopper_id.clone());
        let session = inner.collab.get_mut(&key).filter(|s| s.status == CollabStatus::Pending);
        match session {
            Some(session) => {
                session.status = if accepted {
                    CollabStatus::Accepted
                } else {
                    CollabStatus::Rejected
                };
                session.responded_at = Some(now);
                Ok(session.clone())
            }
            None => Err(CollabError::NoPendingRequest {
                shopper: shopper_id.clone(),
                rep: rep_id.clone(),
            }),
        }
    }

    /// Transition a session to `ended`, if one exists and is not already
    /// `rejected` or `ended` (spec §3: `{pending, accepted} -> ended`).
    /// Returns the session in its post-call state, or `None` if no
    /// session exists for this pair at all.
    pub fn end_collab(
        &self,
        shopper_id: &ShopperId,
        rep_id: &RepId,
    ) -> Option<CollabSession> {
        let mut inner = self.lock();
        let session = inner.collab.get_mut(&(rep_id.clone(), shopper_id.clone()))?;
        if matches!(session.status, CollabStatus::Pending | CollabStatus::Accepted) {
            session.status = CollabStatus::Ended;
        }
        Some(session.clone())
    }

    /// Look up the current session for a pair, if any.
    #[must_use]
    pub fn get_collab(&self, shopper_id: &ShopperId, rep_id: &RepId) -> Option<CollabSession> {
        self.lock().collab.get(&(rep_id.clone(), shopper_id.clone())).cloned()
    }

    // ---------------------------------------------------------------
    // Janitor sweeps (spec §4.7)
    // ---------------------------------------------------------------

    /// Evict disconnected shopper entries past the grace window. Returns
    /// the ids removed, for logging and the caller's broadcast decision.
    pub fn evict_stale_disconnected(&self, now: DateTime<Utc>, grace: Duration) -> Vec<ShopperId> {
        let mut inner = self.lock();
        let stale: Vec<ShopperId> = inner
            .shoppers
            .values()
            .filter_map(|record| {
                let entry = &record.entry;
                let disconnected_at = entry.disconnected_at?;
                let elapsed = (now - disconnected_at).to_std().ok()?;
                (!entry.is_connected && elapsed > grace).then(|| entry.shopper_id.clone())
            })
            .collect();
        for id in &stale {
            inner.shoppers.remove(id);
            debug!(shopper_id = %id, "janitor evicted stale disconnected shopper");
        }
        stale
    }

    /// Delete `pending` collaboration sessions older than `ttl`. Returns
    /// the (rep, shopper) keys removed.
    pub fn evict_expired_collab(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<(RepId, ShopperId)> {
        let mut inner = self.lock();
        let expired: Vec<(RepId, ShopperId)> = inner
            .collab
            .iter()
            .filter_map(|(key, session)| {
                if session.status != CollabStatus::Pending {
                    return None;
                }
                let elapsed = (now - session.requested_at).to_std().ok()?;
                (elapsed > ttl).then(|| key.clone())
            })
            .collect();
        for key in &expired {
            inner.collab.remove(key);
            debug!(rep_id = %key.0, shopper_id = %key.1, "janitor evicted expired collaboration request");
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use dealer_core::ShopperId;
    use serde_json::json;

    type TestStore = StateStore<u32, u32>;

    fn shopper(id: &str) -> ShopperId {
        ShopperId(id.to_string())
    }

    fn rep(id: &str) -> RepId {
        RepId(id.to_string())
    }

    #[test]
    fn join_disconnect_rejoin_preserves_connected_at() {
        let store = TestStore::new(16);
        let t0 = Utc::now();
        let first = store.upsert_shopper(shopper("s1"), 1, true, json!({}), t0);

        let t1 = t0 + ChronoDuration::seconds(5);
        store.mark_shopper_disconnected(&shopper("s1"), t1);

        let t2 = t1 + ChronoDuration::seconds(5);
        let rejoined = store.upsert_shopper(shopper("s1"), 2, true, json!({}), t2);

        assert_eq!(rejoined.connected_at, first.connected_at);
        assert!(rejoined.is_connected);
        assert!(rejoined.disconnected_at.is_none());
    }

    #[test]
    fn sequential_joins_keep_fifo_order() {
        let store = TestStore::new(16);
        let t0 = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), t0);
        let t1 = t0 + ChronoDuration::seconds(1);
        store.upsert_shopper(shopper("s2"), 2, true, json!({}), t1);

        assert_eq!(store.position_of(&shopper("s1")), 1);
        assert_eq!(store.position_of(&shopper("s2")), 2);

        let snapshot = store.snapshot_queue(t1);
        let ids: Vec<_> = snapshot.iter().map(|s| s.shopper_id.0.clone()).collect();
        assert_eq!(ids, vec!["s1".to_string(), "s2".to_string()]);
    }

    #[test]
    fn double_claim_is_denied_and_state_unchanged() {
        let store = TestStore::new(16);
        let now = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), now);

        store.assign(&shopper("s1"), &rep("r1")).unwrap();
        let err = store.assign(&shopper("s1"), &rep("r2")).unwrap_err();
        assert_eq!(
            err,
            AssignError::AlreadyClaimed {
                shopper: shopper("s1"),
                by: rep("r1"),
            }
        );

        let entry = store.get_shopper(&shopper("s1")).unwrap();
        assert_eq!(entry.assigned_rep_id, Some(rep("r1")));
    }

    #[test]
    fn claim_release_restores_queue_state_except_connected_at() {
        let store = TestStore::new(16);
        let now = Utc::now();
        let before = store.upsert_shopper(shopper("s1"), 1, true, json!({}), now);

        store.assign(&shopper("s1"), &rep("r1")).unwrap();
        let (after, previous_rep) = store.release(&shopper("s1")).unwrap();

        assert_eq!(previous_rep, rep("r1"));
        assert_eq!(after.assigned_rep_id, None);
        assert_eq!(after.connected_at, before.connected_at);
    }

    #[test]
    fn rep_busy_blocks_second_claim() {
        let store = TestStore::new(16);
        let now = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), now);
        store.upsert_shopper(shopper("s2"), 2, true, json!({}), now);

        store.assign(&shopper("s1"), &rep("r1")).unwrap();
        let err = store.assign(&shopper("s2"), &rep("r1")).unwrap_err();
        assert_eq!(err, AssignError::RepBusy(rep("r1")));
    }

    #[test]
    fn shopper_left_is_idempotent() {
        let store = TestStore::new(16);
        let now = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), now);

        assert!(store.remove_shopper(&shopper("s1")));
        assert!(!store.remove_shopper(&shopper("s1")));
    }

    #[test]
    fn disconnect_grace_window_boundary() {
        let store = TestStore::new(16);
        let t0 = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), t0);
        store.mark_shopper_disconnected(&shopper("s1"), t0);

        let grace = Duration::from_secs(60);

        let just_under = t0 + ChronoDuration::milliseconds(60_000 - 1);
        let evicted = store.evict_stale_disconnected(just_under, grace);
        assert!(evicted.is_empty());
        assert!(store.get_shopper(&shopper("s1")).is_some());

        let just_over = t0 + ChronoDuration::milliseconds(60_000 + 1);
        let evicted = store.evict_stale_disconnected(just_over, grace);
        assert_eq!(evicted, vec![shopper("s1")]);
        assert!(store.get_shopper(&shopper("s1")).is_none());
    }

    #[test]
    fn collab_request_requires_current_assignment() {
        let store = TestStore::new(16);
        let now = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), now);

        let err = store.request_collab(&shopper("s1"), &rep("r1"), now).unwrap_err();
        assert_eq!(
            err,
            CollabError::NotAssigned {
                shopper: shopper("s1"),
                rep: rep("r1"),
            }
        );
    }

    #[test]
    fn collab_request_accept_and_release_ends_it() {
        let store = TestStore::new(16);
        let now = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), now);
        store.assign(&shopper("s1"), &rep("r1")).unwrap();

        store.request_collab(&shopper("s1"), &rep("r1"), now).unwrap();
        let accepted = store
            .respond_collab(&shopper("s1"), &rep("r1"), true, now)
            .unwrap();
        assert_eq!(accepted.status, CollabStatus::Accepted);

        store.release(&shopper("s1")).unwrap();
        let ended = store.end_collab(&shopper("s1"), &rep("r1")).unwrap();
        assert_eq!(ended.status, CollabStatus::Ended);
    }

    #[test]
    fn collab_request_ttl_boundary() {
        let store = TestStore::new(16);
        let t0 = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), t0);
        store.assign(&shopper("s1"), &rep("r1")).unwrap();
        store.request_collab(&shopper("s1"), &rep("r1"), t0).unwrap();

        let ttl = Duration::from_secs(300);

        let just_under = t0 + ChronoDuration::milliseconds(300_000 - 1);
        assert!(store.evict_expired_collab(just_under, ttl).is_empty());
        assert!(store.get_collab(&shopper("s1"), &rep("r1")).is_some());

        let just_over = t0 + ChronoDuration::milliseconds(300_000 + 1);
        let expired = store.evict_expired_collab(just_over, ttl);
        assert_eq!(expired, vec![(rep("r1"), shopper("s1"))]);
        assert!(store.get_collab(&shopper("s1"), &rep("r1")).is_none());
    }

    #[test]
    fn snapshot_is_pure_between_mutations() {
        let store = TestStore::new(16);
        let now = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), now);
        store.upsert_shopper(shopper("s2"), 2, false, json!({}), now);

        let a = store.snapshot_queue(now);
        let b = store.snapshot_queue(now);
        assert_eq!(
            a.iter().map(|s| s.shopper_id.clone()).collect::<Vec<_>>(),
            b.iter().map(|s| s.shopper_id.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn at_most_one_shopper_per_rep_invariant() {
        let store = TestStore::new(16);
        let now = Utc::now();
        store.upsert_shopper(shopper("s1"), 1, true, json!({}), now);
        store.upsert_shopper(shopper("s2"), 2, true, json!({}), now);

        store.assign(&shopper("s1"), &rep("r1")).unwrap();
        assert!(store.assign(&shopper("s2"), &rep("r1")).is_err());

        let holders: Vec<_> = [shopper("s1"), shopper("s2")]
            .into_iter()
            .filter(|id| {
                store
                    .get_shopper(id)
                    .and_then(|e| e.assigned_rep_id)
                    .as_ref()
                    == Some(&rep("r1"))
            })
            .collect();
        assert_eq!(holders.len(), 1);
    }
}

//! In-process rooms for the collaboration document relay (spec §4.6).
//!
//! Distinct from the collaboration *handshake* tracked in the state
//! store: this is pure fan-out of opaque bytes among whoever is
//! connected to the room named by a shopper id, plus enough
//! accumulated history to fast-forward a late joiner. The document
//! engine's own merge semantics live entirely in the clients; the core
//! never interprets a byte of the payload.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::extract::ws::Message;
use dealer_core::ShopperId;
use tokio::sync::mpsc;
use tracing::debug;

type ParticipantId = u64;

struct Room {
    participants: Vec<(ParticipantId, mpsc::UnboundedSender<Message>)>,
    history: Vec<Vec<u8>>,
    next_id: ParticipantId,
}

impl Room {
    fn empty() -> Self {
        Self {
            participants: Vec::new(),
            history: Vec::new(),
            next_id: 0,
        }
    }
}

/// Registry of collaboration-document rooms, one per shopper id with at
/// least one connected participant.
pub struct CollabRooms {
    rooms: Mutex<HashMap<ShopperId, Room>>,
}

impl CollabRooms {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ShopperId, Room>> {
        self.rooms.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Join the room for `shopper_id`, creating it if this is the first
    /// participant. Returns this connection's participant id (used to
    /// leave later) and the accumulated history to fast-forward with.
    pub fn join(&self, shopper_id: &ShopperId, tx: mpsc::UnboundedSender<Message>) -> (ParticipantId, Vec<Vec<u8>>) {
        let mut rooms = self.lock();
        let room = rooms.entry(shopper_id.clone()).or_insert_with(Room::empty);
        let id = room.next_id;
        room.next_id += 1;
        room.participants.push((id, tx));
        (id, room.history.clone())
    }

    /// Append an update to the room's history and forward it to every
    /// other participant. The sender never receives its own update back.
    pub fn broadcast(&self, shopper_id: &ShopperId, sender_id: ParticipantId, payload: Vec<u8>) {
        let mut rooms = self.lock();
        let Some(room) = rooms.get_mut(shopper_id) else {
            return;
        };
        room.history.push(payload.clone());
        room.participants.retain(|(id, tx)| {
            if *id == sender_id {
                return true;
            }
            tx.send(Message::Binary(payload.clone())).is_ok()
        });
    }

    /// Remove a participant, tearing the room down if it becomes empty.
    pub fn leave(&self, shopper_id: &ShopperId, participant_id: ParticipantId) {
        let mut rooms = self.lock();
        if let Some(room) = rooms.get_mut(shopper_id) {
            room.participants.retain(|(id, _)| *id != participant_id);
            if room.participants.is_empty() {
                rooms.remove(shopper_id);
                debug!(%shopper_id, "collaboration room torn down");
            }
        }
    }
}

impl Default for CollabRooms {
    fn default() -> Self {
        Self::new()
    }
}

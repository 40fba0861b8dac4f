//! End-to-end scenario tests (spec §8), driven through the real handler
//! dispatch functions (`shopper_ws::handle_frame` / `rep_ws::handle_frame`)
//! rather than the store directly — each connection is stood in for by an
//! `mpsc` channel, exactly the handle type the handlers themselves store,
//! and the assertions inspect frames the production dispatch path
//! actually emitted.

use axum::extract::ws::Message;
use dealer_config::Config;
use dealer_core::{CollabStatus, RepId, ShopperId};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::rep_ws;
use crate::shopper_ws;
use crate::state::AppState;
use crate::wire::{RepInbound, ShopperInbound};

fn drain_as_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            frames.push(serde_json::from_str(&text).unwrap());
        }
    }
    frames
}

struct Harness {
    state: AppState,
}

impl Harness {
    fn new() -> Self {
        Self { state: AppState::new(Config::default()) }
    }

    fn shopper_conn(&self, id: &str) -> (ShopperId, mpsc::UnboundedSender<Message>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ShopperId(id.to_string()), tx, rx)
    }

    fn rep_conn(&self, id: &str) -> (RepId, mpsc::UnboundedSender<Message>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RepId(id.to_string()), tx, rx)
    }

    async fn shopper_send(
        &self,
        tx: &mpsc::UnboundedSender<Message>,
        current: Option<ShopperId>,
        frame: ShopperInbound,
    ) -> Option<ShopperId> {
        shopper_ws::handle_frame(&self.state, tx, current, frame).await
    }

    async fn rep_send(
        &self,
        tx: &mpsc::UnboundedSender<Message>,
        current: Option<RepId>,
        frame: RepInbound,
    ) -> Option<RepId> {
        rep_ws::handle_frame(&self.state, tx, current, frame).await
    }
}

#[tokio::test]
async fn scenario_1_join_and_position() {
    let h = Harness::new();
    let (r1, r1_tx, mut r1_rx) = h.rep_conn("R1");
    h.rep_send(&r1_tx, None, RepInbound::Connect { sales_rep_id: r1 }).await;
    drain_as_json(&mut r1_rx); // connected + initial empty snapshot

    let (s1, s1_tx, mut s1_rx) = h.shopper_conn("S1");
    h.shopper_send(
        &s1_tx,
        None,
        ShopperInbound::JoinQueue {
            shopper_id: s1.clone(),
            media_capabilities: json!({"hasAudioInput": true}),
        },
    )
    .await;

    let shopper_frames = drain_as_json(&mut s1_rx);
    assert_eq!(shopper_frames[0]["type"], "queue_joined");
    assert_eq!(shopper_frames[0]["position"], 1);
    assert_eq!(shopper_frames[0]["hasMicrophone"], true);

    // `queue_update` delivery to already-connected reps rides the store's
    // broadcast channel, forwarded by a task tied to the socket lifecycle
    // (`rep_ws::handle_socket`), not by `handle_frame` itself — assert the
    // snapshot `join_queue` actually produced instead of a forwarded frame.
    let snapshot = h.state.store.snapshot_queue(chrono::Utc::now());
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].shopper_id, s1);
    assert!(snapshot[0].is_connected);
    assert!(snapshot[0].assigned_rep_id.is_none());
    let _ = &mut r1_rx;
}

#[tokio::test]
async fn scenario_2_sequential_joins_keep_fifo_order() {
    let h = Harness::new();
    let (s1, s1_tx, _s1_rx) = h.shopper_conn("S1");
    h.shopper_send(
        &s1_tx,
        None,
        ShopperInbound::JoinQueue { shopper_id: s1.clone(), media_capabilities: json!({}) },
    )
    .await;

    let (s2, s2_tx, mut s2_rx) = h.shopper_conn("S2");
    h.shopper_send(
        &s2_tx,
        None,
        ShopperInbound::JoinQueue { shopper_id: s2.clone(), media_capabilities: json!({}) },
    )
    .await;

    let frames = drain_as_json(&mut s2_rx);
    assert_eq!(frames[0]["position"], 2);

    let snapshot = h.state.store.snapshot_queue(chrono::Utc::now());
    assert_eq!(snapshot[0].shopper_id, s1);
    assert_eq!(snapshot[1].shopper_id, s2);
}

#[tokio::test]
async fn scenario_3_claim_handshake() {
    let h = Harness::new();
    let (s1, s1_tx, mut s1_rx) = h.shopper_conn("S1");
    h.shopper_send(
        &s1_tx,
        None,
        ShopperInbound::JoinQueue { shopper_id: s1.clone(), media_capabilities: json!({}) },
    )
    .await;
    drain_as_json(&mut s1_rx);

    let (r1, r1_tx, mut r1_rx) = h.rep_conn("R1");
    h.rep_send(&r1_tx, None, RepInbound::Connect { sales_rep_id: r1.clone() }).await;
    drain_as_json(&mut r1_rx);

    let sdp_offer = json!({"sdp": "offer-blob"});
    h.rep_send(
        &r1_tx,
        Some(r1.clone()),
        RepInbound::ClaimCall {
            sales_rep_id: r1.clone(),
            shopper_id: s1.clone(),
            sdp_offer: sdp_offer.clone(),
        },
    )
    .await;

    let rep_frames = drain_as_json(&mut r1_rx);
    assert_eq!(rep_frames[0]["type"], "call_claimed");

    let shopper_frames = drain_as_json(&mut s1_rx);
    assert_eq!(shopper_frames[0]["type"], "call_answered");
    assert_eq!(shopper_frames[0]["sdpOffer"], sdp_offer);

    let entry = h.state.store.get_shopper(&s1).unwrap();
    assert_eq!(entry.assigned_rep_id, Some(r1));
}

#[tokio::test]
async fn scenario_4_double_claim_denied_emits_no_broadcast() {
    let h = Harness::new();
    let (s1, s1_tx, _s1_rx) = h.shopper_conn("S1");
    h.shopper_send(
        &s1_tx,
        None,
        ShopperInbound::JoinQueue { shopper_id: s1.clone(), media_capabilities: json!({}) },
    )
    .await;

    let (r1, r1_tx, _r1_rx) = h.rep_conn("R1");
    h.rep_send(&r1_tx, None, RepInbound::Connect { sales_rep_id: r1.clone() }).await;
    h.rep_send(
        &r1_tx,
        Some(r1.clone()),
        RepInbound::ClaimCall { sales_rep_id: r1.clone(), shopper_id: s1.clone(), sdp_offer: json!({}) },
    )
    .await;

    let (r2, r2_tx, mut r2_rx) = h.rep_conn("R2");
    h.rep_send(&r2_tx, None, RepInbound::Connect { sales_rep_id: r2.clone() }).await;
    drain_as_json(&mut r2_rx);

    h.rep_send(
        &r2_tx,
        Some(r2.clone()),
        RepInbound::ClaimCall { sales_rep_id: r2.clone(), shopper_id: s1.clone(), sdp_offer: json!({}) },
    )
    .await;

    let frames = drain_as_json(&mut r2_rx);
    assert_eq!(frames.len(), 1, "a denied claim must not also trigger a broadcast to this rep");
    assert_eq!(frames[0]["type"], "error");

    let entry = h.state.store.get_shopper(&s1).unwrap();
    assert_eq!(entry.assigned_rep_id, Some(r1));
}

#[tokio::test]
async fn scenario_5_release_restores_fifo_position() {
    let h = Harness::new();
    let (s1, s1_tx, mut s1_rx) = h.shopper_conn("S1");
    h.shopper_send(
        &s1_tx,
        None,
        ShopperInbound::JoinQueue { shopper_id: s1.clone(), media_capabilities: json!({}) },
    )
    .await;
    let (s2, s2_tx, _s2_rx) = h.shopper_conn("S2");
    h.shopper_send(
        &s2_tx,
        None,
        ShopperInbound::JoinQueue { shopper_id: s2.clone(), media_capabilities: json!({}) },
    )
    .await;

    let (r1, r1_tx, mut r1_rx) = h.rep_conn("R1");
    h.rep_send(&r1_tx, None, RepInbound::Connect { sales_rep_id: r1.clone() }).await;
    h.rep_send(
        &r1_tx,
        Some(r1.clone()),
        RepInbound::ClaimCall { sales_rep_id: r1.clone(), shopper_id: s1.clone(), sdp_offer: json!({}) },
    )
    .await;
    drain_as_json(&mut s1_rx);
    drain_as_json(&mut r1_rx);

    h.rep_send(
        &r1_tx,
        Some(r1.clone()),
        RepInbound::ReleaseCall { sales_rep_id: r1.clone(), shopper_id: s1.clone() },
    )
    .await;

    let shopper_frames = drain_as_json(&mut s1_rx);
    let released = shopper_frames.iter().find(|f| f["type"] == "call_released").unwrap();
    assert_eq!(released["position"], 1);

    assert_eq!(h.state.store.position_of(&s1), 1);
    assert_eq!(h.state.store.position_of(&s2), 2);
}

#[tokio::test]
async fn scenario_6_collaboration_request_then_accept() {
    let h = Harness::new();
    let (s1, s1_tx, mut s1_rx) = h.shopper_conn("S1");
    h.shopper_send(
        &s1_tx,
        None,
        ShopperInbound::JoinQueue { shopper_id: s1.clone(), media_capabilities: json!({}) },
    )
    .await;
    drain_as_json(&mut s1_rx);

    let (r1, r1_tx, mut r1_rx) = h.rep_conn("R1");
    h.rep_send(&r1_tx, None, RepInbound::Connect { sales_rep_id: r1.clone() }).await;
    h.rep_send(
        &r1_tx,
        Some(r1.clone()),
        RepInbound::ClaimCall { sales_rep_id: r1.clone(), shopper_id: s1.clone(), sdp_offer: json!({}) },
    )
    .await;
    drain_as_json(&mut s1_rx);
    drain_as_json(&mut r1_rx);

    h.rep_send(
        &r1_tx,
        Some(r1.clone()),
        RepInbound::RequestCollaboration { sales_rep_id: r1.clone(), shopper_id: s1.clone() },
    )
    .await;

    let shopper_frames = drain_as_json(&mut s1_rx);
    assert_eq!(shopper_frames[0]["type"], "collaboration_request");

    h.shopper_send(
        &s1_tx,
        Some(s1.clone()),
        ShopperInbound::CollaborationResponse {
            shopper_id: s1.clone(),
            sales_rep_id: r1.clone(),
            accepted: true,
        },
    )
    .await;

    let shopper_frames = drain_as_json(&mut s1_rx);
    assert_eq!(shopper_frames[0]["status"], "accepted");
    let rep_frames = drain_as_json(&mut r1_rx);
    assert_eq!(rep_frames[0]["status"], "accepted");

    let session = h.state.store.get_collab(&s1, &r1).unwrap();
    assert_eq!(session.status, CollabStatus::Accepted);
}

#[tokio::test]
async fn scenario_7_shopper_ends_call_ends_collaboration() {
    let h = Harness::new();
    let (s1, s1_tx, mut s1_rx) = h.shopper_conn("S1");
    h.shopper_send(
        &s1_tx,
        None,
        ShopperInbound::JoinQueue { shopper_id: s1.clone(), media_capabilities: json!({}) },
    )
    .await;
    drain_as_json(&mut s1_rx);

    let (r1, r1_tx, mut r1_rx) = h.rep_conn("R1");
    h.rep_send(&r1_tx, None, RepInbound::Connect { sales_rep_id: r1.clone() }).await;
    h.rep_send(
        &r1_tx,
        Some(r1.clone()),
        RepInbound::ClaimCall { sales_rep_id: r1.clone(), shopper_id: s1.clone(), sdp_offer: json!({}) },
    )
    .await;
    h.rep_send(
        &r1_tx,
        Some(r1.clone()),
        RepInbound::RequestCollaboration { sales_rep_id: r1.clone(), shopper_id: s1.clone() },
    )
    .await;
    h.shopper_send(
        &s1_tx,
        Some(s1.clone()),
        ShopperInbound::CollaborationResponse { shopper_id: s1.clone(), sales_rep_id: r1.clone(), accepted: true },
    )
    .await;
    drain_as_json(&mut s1_rx);
    drain_as_json(&mut r1_rx);

    h.shopper_send(&s1_tx, Some(s1.clone()), ShopperInbound::EndCall { shopper_id: s1.clone() }).await;

    let shopper_frames = drain_as_json(&mut s1_rx);
    assert!(shopper_frames.iter().any(|f| f["type"] == "call_ended"));
    let rep_frames = drain_as_json(&mut r1_rx);
    assert!(rep_frames.iter().any(|f| f["type"] == "call_ended_by_shopper"));

    let entry = h.state.store.get_shopper(&s1).unwrap();
    assert!(entry.assigned_rep_id.is_none());
    let session = h.state.store.get_collab(&s1, &r1).unwrap();
    assert_eq!(session.status, CollabStatus::Ended);
}

#[tokio::test]
async fn ice_candidate_from_a_rep_that_does_not_own_the_call_is_rejected() {
    let h = Harness::new();
    let (s1, s1_tx, _s1_rx) = h.shopper_conn("S1");
    h.shopper_send(
        &s1_tx,
        None,
        ShopperInbound::JoinQueue { shopper_id: s1.clone(), media_capabilities: json!({}) },
    )
    .await;

    let (r1, r1_tx, _r1_rx) = h.rep_conn("R1");
    h.rep_send(&r1_tx, None, RepInbound::Connect { sales_rep_id: r1.clone() }).await;
    h.rep_send(
        &r1_tx,
        Some(r1.clone()),
        RepInbound::ClaimCall { sales_rep_id: r1.clone(), shopper_id: s1.clone(), sdp_offer: json!({}) },
    )
    .await;

    let (r2, r2_tx, mut r2_rx) = h.rep_conn("R2");
    h.rep_send(&r2_tx, None, RepInbound::Connect { sales_rep_id: r2.clone() }).await;
    drain_as_json(&mut r2_rx);

    h.rep_send(
        &r2_tx,
        Some(r2.clone()),
        RepInbound::IceCandidate { sales_rep_id: r2.clone(), shopper_id: s1.clone(), ice_candidate: json!({}) },
    )
    .await;

    let frames = drain_as_json(&mut r2_rx);
    assert_eq!(frames[0]["type"], "error");
}

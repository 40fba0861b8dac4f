//! JSON wire frames for the three duplex channels (spec §6).
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound
//! frames derive [`serde::Deserialize`] only; outbound frames derive
//! [`serde::Serialize`] only — the two directions never share a type, so
//! an accidental cross-wiring (sending an inbound-shaped frame back to a
//! client) doesn't typecheck.

use dealer_core::{QueueSummary, RepId, ShopperId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------
// Shopper channel — /api/ws/call
// ---------------------------------------------------------------------

/// Frames a shopper's client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShopperInbound {
    /// Join the waiting line. `shopperId` becomes this connection's
    /// sticky identity.
    #[serde(rename_all = "camelCase")]
    JoinQueue {
        shopper_id: ShopperId,
        #[serde(default)]
        media_capabilities: Value,
    },
    /// Leave the queue outright.
    #[serde(rename_all = "camelCase")]
    LeaveQueue { shopper_id: ShopperId },
    /// SDP answer in response to a representative's offer.
    #[serde(rename_all = "camelCase")]
    SdpAnswer {
        shopper_id: ShopperId,
        sdp_answer: Value,
    },
    /// ICE candidate for the in-progress signaling exchange.
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        shopper_id: ShopperId,
        ice_candidate: Value,
    },
    /// Shopper-initiated hangup.
    #[serde(rename_all = "camelCase")]
    EndCall { shopper_id: ShopperId },
    /// Accept or decline a pending collaboration request.
    #[serde(rename_all = "camelCase")]
    CollaborationResponse {
        shopper_id: ShopperId,
        sales_rep_id: RepId,
        accepted: bool,
    },
}

/// Frames sent to a shopper's client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShopperOutbound {
    /// Liveness acknowledgment sent immediately after the socket opens.
    #[serde(rename_all = "camelCase")]
    Connected { message: String },
    /// Acknowledges `join_queue` with the shopper's current position.
    #[serde(rename_all = "camelCase")]
    QueueJoined {
        shopper_id: ShopperId,
        position: usize,
        has_microphone: bool,
    },
    /// Acknowledges `leave_queue`.
    #[serde(rename_all = "camelCase")]
    QueueLeft { shopper_id: ShopperId },
    /// A representative claimed this shopper's call.
    #[serde(rename_all = "camelCase")]
    CallAnswered {
        sales_rep_id: RepId,
        message: String,
        sdp_offer: Value,
    },
    /// The call was released (by either party).
    #[serde(rename_all = "camelCase")]
    CallReleased {
        previous_sales_rep_id: RepId,
        position: usize,
        message: String,
    },
    /// ICE candidate forwarded from the assigned representative.
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        sales_rep_id: RepId,
        ice_candidate: Value,
    },
    /// Confirms a shopper-initiated `end_call`.
    #[serde(rename_all = "camelCase")]
    CallEnded { shopper_id: ShopperId },
    /// A representative is requesting a collaboration session.
    #[serde(rename_all = "camelCase")]
    CollaborationRequest {
        sales_rep_id: RepId,
        sales_rep_name: String,
    },
    /// The collaboration session's status changed.
    #[serde(rename_all = "camelCase")]
    CollaborationStatus { status: dealer_core::CollabStatus },
    /// A request could not be fulfilled.
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

// ---------------------------------------------------------------------
// Representative channel — /api/ws/calls/monitor
// ---------------------------------------------------------------------

/// Frames a representative's client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepInbound {
    /// Register this connection under a representative id.
    #[serde(rename_all = "camelCase")]
    Connect { sales_rep_id: RepId },
    /// Claim a waiting shopper.
    #[serde(rename_all = "camelCase")]
    ClaimCall {
        sales_rep_id: RepId,
        shopper_id: ShopperId,
        sdp_offer: Value,
    },
    /// Release a claimed shopper.
    #[serde(rename_all = "camelCase")]
    ReleaseCall {
        sales_rep_id: RepId,
        shopper_id: ShopperId,
    },
    /// ICE candidate for a call this representative owns.
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        sales_rep_id: RepId,
        shopper_id: ShopperId,
        ice_candidate: Value,
    },
    /// Ask the shopper to enter collaboration mode.
    #[serde(rename_all = "camelCase")]
    RequestCollaboration {
        sales_rep_id: RepId,
        shopper_id: ShopperId,
    },
}

/// Frames sent to a representative's client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepOutbound {
    /// Liveness acknowledgment sent after `connect` registers the rep.
    #[serde(rename_all = "camelCase")]
    Connected { message: String },
    /// Full queue snapshot, pushed on every state change (spec §4.5).
    #[serde(rename_all = "camelCase")]
    QueueUpdate { queue: Vec<QueueSummary> },
    /// Acknowledges a successful `claim_call`.
    #[serde(rename_all = "camelCase")]
    CallClaimed {
        shopper_id: ShopperId,
        message: String,
    },
    /// Acknowledges a successful `release_call`.
    #[serde(rename_all = "camelCase")]
    CallReleased {
        shopper_id: ShopperId,
        message: String,
    },
    /// SDP answer forwarded from the shopper.
    #[serde(rename_all = "camelCase")]
    SdpAnswer {
        shopper_id: ShopperId,
        sdp_answer: Value,
    },
    /// ICE candidate forwarded from the shopper.
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        shopper_id: ShopperId,
        ice_candidate: Value,
    },
    /// The shopper hung up a call this representative owned.
    #[serde(rename_all = "camelCase")]
    CallEndedByShopper { shopper_id: ShopperId },
    /// The collaboration session's status changed.
    #[serde(rename_all = "camelCase")]
    CollaborationStatus { status: dealer_core::CollabStatus },
    /// A request could not be fulfilled.
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

// ---------------------------------------------------------------------
// Frame parsing (spec §7) — BadFrame vs UnknownType
// ---------------------------------------------------------------------

/// The two ways a raw inbound frame can fail to become a typed value.
///
/// A recognized `type` tag with a body that otherwise fails to parse is
/// `BadFrame`, reported back to the client. An unrecognized `type` tag
/// is `UnknownType`, which the caller only logs — the client gets no
/// reply for a frame kind it didn't know existed.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Invalid message format")]
    BadFrame,
    #[error("unrecognized frame type: {0}")]
    UnknownType(String),
}

const SHOPPER_INBOUND_TYPES: &[&str] = &[
    "join_queue",
    "leave_queue",
    "sdp_answer",
    "ice_candidate",
    "end_call",
    "collaboration_response",
];

const REP_INBOUND_TYPES: &[&str] = &[
    "connect",
    "claim_call",
    "release_call",
    "ice_candidate",
    "request_collaboration",
];

fn classify<T: DeserializeOwned>(text: &str, known_types: &[&str]) -> Result<T, FrameError> {
    let value: Value = serde_json::from_str(text).map_err(|_| FrameError::BadFrame)?;
    let type_tag = value.get("type").and_then(Value::as_str).map(str::to_string);
    serde_json::from_value::<T>(value).map_err(|_| match type_tag {
        Some(tag) if !known_types.contains(&tag.as_str()) => FrameError::UnknownType(tag),
        _ => FrameError::BadFrame,
    })
}

/// Parse a raw shopper-channel frame, classifying the failure mode.
pub fn parse_shopper_inbound(text: &str) -> Result<ShopperInbound, FrameError> {
    classify(text, SHOPPER_INBOUND_TYPES)
}

/// Parse a raw representative-channel frame, classifying the failure mode.
pub fn parse_rep_inbound(text: &str) -> Result<RepInbound, FrameError> {
    classify(text, REP_INBOUND_TYPES)
}

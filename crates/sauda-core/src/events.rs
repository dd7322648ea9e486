// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire-level event types.
//!
//! Inbound events arrive from participants over the gateway; outbound
//! events are fanned out to room subscribers or targeted at a single
//! connection. Both are closed tagged enums so shape validation happens
//! exactly once, at the serialization boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::SaudaError;
use crate::types::{
    ChatMessage, ClosureInfo, CounterOffer, Deal, DealAction, DealId, DealItem,
    ParticipantRole, PriceBand, RoomKey, RoomPhase, RoomStatus, StructuredOffer, VendorId,
};

/// A seller's verdict on the current structured offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SellerChoice {
    Accept,
    Counter,
    Reject,
}

/// A buyer's verdict on the seller's counter-offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BuyerChoice {
    Accept,
    Reject,
}

/// Outcome of a review decision, as broadcast to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Accepted,
    Countered,
    Rejected,
}

/// A proposed deal line item as sent by a client (subtotals are computed
/// server-side, never trusted from the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
}

/// Events a participant can send into the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Join (and on first join, create) a negotiation room.
    Join {
        room_key: RoomKey,
        role: ParticipantRole,
        display_name: String,
        language: String,
        commodity: String,
        location: String,
        seller_id: VendorId,
    },
    /// Subscribe this connection to a seller's personal notification
    /// channel. Sellers call this once, independent of any room.
    JoinSellerChannel { seller_id: VendorId },
    UpdatePreference {
        room_key: RoomKey,
        role: ParticipantRole,
        language: String,
    },
    SubmitOffer {
        room_key: RoomKey,
        quantity: f64,
        unit_price: f64,
        purpose: Option<String>,
    },
    SellerDecision {
        room_key: RoomKey,
        decision: SellerChoice,
        counter_price: Option<f64>,
    },
    BuyerDecision {
        room_key: RoomKey,
        decision: BuyerChoice,
    },
    SendMessage {
        room_key: RoomKey,
        role: ParticipantRole,
        text: String,
        language: String,
        audio_ref: Option<String>,
    },
    /// Share a draft deal with the room without changing any state.
    PreviewDeal {
        room_key: RoomKey,
        proposer: ParticipantRole,
        items: Vec<ProposedItem>,
        total: f64,
    },
    CreateDeal {
        room_key: RoomKey,
        items: Vec<ProposedItem>,
        total: f64,
    },
    EndNegotiation {
        room_key: RoomKey,
        initiator: ParticipantRole,
    },
    /// Deal lifecycle action; addressed by deal id since the owning room
    /// is usually closed by the time signatures arrive.
    UpdateDealStatus {
        deal_id: DealId,
        action: DealAction,
        address: Option<String>,
    },
}

impl InboundEvent {
    /// The room this event addresses, when it addresses one.
    pub fn room_key(&self) -> Option<&RoomKey> {
        match self {
            InboundEvent::Join { room_key, .. }
            | InboundEvent::UpdatePreference { room_key, .. }
            | InboundEvent::SubmitOffer { room_key, .. }
            | InboundEvent::SellerDecision { room_key, .. }
            | InboundEvent::BuyerDecision { room_key, .. }
            | InboundEvent::SendMessage { room_key, .. }
            | InboundEvent::PreviewDeal { room_key, .. }
            | InboundEvent::CreateDeal { room_key, .. }
            | InboundEvent::EndNegotiation { room_key, .. } => Some(room_key),
            InboundEvent::JoinSellerChannel { .. }
            | InboundEvent::UpdateDealStatus { .. } => None,
        }
    }
}

/// Machine-readable code carried on wire errors so clients can
/// distinguish "wrong phase" from "closed" from "never existed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    WrongPhase,
    RoomNotFound,
    RoomClosed,
    DealNotFound,
    InvalidDealTransition,
    InvalidRequest,
    Internal,
}

/// Events delivered to participants.
///
/// Broadcast events go to every subscriber of a room; `RoomStateSync`,
/// `ModerationWarning`, and `Error` are targeted at a single connection;
/// `NewNegotiationRequest` goes to a seller's notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Full authoritative room snapshot. Greeting and insight are
    /// localized for the receiving participant; messages carry their
    /// whole translation maps so the client picks its side.
    RoomStateSync {
        room_key: RoomKey,
        phase: RoomPhase,
        status: RoomStatus,
        greeting: Option<String>,
        insight: Option<String>,
        too_low: Option<bool>,
        market: Option<PriceBand>,
        current_offer: Option<StructuredOffer>,
        counter_offer: Option<CounterOffer>,
        closure: Option<ClosureInfo>,
        messages: Vec<ChatMessage>,
    },
    NewMessage {
        room_key: RoomKey,
        message: ChatMessage,
    },
    /// A mediator insight appended after evaluating an offer or counter.
    AiInsight {
        room_key: RoomKey,
        message: ChatMessage,
    },
    OfferSubmitted {
        room_key: RoomKey,
        offer: StructuredOffer,
        too_low: bool,
    },
    DecisionUpdate {
        room_key: RoomKey,
        by: ParticipantRole,
        decision: DecisionOutcome,
        counter_price: Option<f64>,
    },
    DealPreview {
        room_key: RoomKey,
        proposer: ParticipantRole,
        items: Vec<DealItem>,
        total: f64,
    },
    DealCreated {
        room_key: RoomKey,
        deal: Deal,
    },
    DealUpdated {
        deal: Deal,
    },
    ConversationClosed {
        room_key: RoomKey,
        closure: ClosureInfo,
    },
    /// Sent only to the participant whose message was rejected.
    ModerationWarning {
        room_key: RoomKey,
        reason: String,
    },
    /// Sent on a seller's notification channel when a buyer opens a room.
    NewNegotiationRequest {
        room_key: RoomKey,
        buyer_name: String,
        commodity: String,
        location: String,
        at: DateTime<Utc>,
    },
    Error {
        code: ErrorCode,
        notice: String,
        room_key: Option<RoomKey>,
    },
}

impl OutboundEvent {
    /// Maps a caller-facing failure onto the wire error event. Gateway
    /// and transport failures are recovered before they reach here, so
    /// anything unmatched surfaces as `Internal`.
    pub fn from_error(err: &SaudaError, room_key: Option<RoomKey>) -> Self {
        let code = match err {
            SaudaError::InvalidPhase { .. } => ErrorCode::WrongPhase,
            SaudaError::RoomNotFound { .. } => ErrorCode::RoomNotFound,
            SaudaError::RoomClosed { .. } => ErrorCode::RoomClosed,
            SaudaError::DealNotFound { .. } => ErrorCode::DealNotFound,
            SaudaError::InvalidDealTransition { .. } => ErrorCode::InvalidDealTransition,
            SaudaError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            _ => ErrorCode::Internal,
        };
        OutboundEvent::Error {
            code,
            notice: err.to_string(),
            room_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClosureReason;

    #[test]
    fn inbound_join_round_trips_with_tag() {
        let event = InboundEvent::Join {
            room_key: RoomKey("room-v1-u1-1".into()),
            role: ParticipantRole::Buyer,
            display_name: "Ravi".into(),
            language: "hi".into(),
            commodity: "Wheat".into(),
            location: "Delhi".into(),
            seller_id: VendorId("v1".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "join");
        assert_eq!(json["role"], "buyer");
        let back: InboundEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn seller_counter_decision_parses_from_wire_json() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"type":"seller_decision","room_key":"room-v1-u1-1","decision":"counter","counter_price":22.0}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::SellerDecision {
                room_key: RoomKey("room-v1-u1-1".into()),
                decision: SellerChoice::Counter,
                counter_price: Some(22.0),
            }
        );
    }

    #[test]
    fn room_key_extraction_covers_room_scoped_events() {
        let scoped = InboundEvent::EndNegotiation {
            room_key: RoomKey("r".into()),
            initiator: ParticipantRole::Seller,
        };
        assert_eq!(scoped.room_key(), Some(&RoomKey("r".into())));

        let unscoped = InboundEvent::UpdateDealStatus {
            deal_id: DealId("d".into()),
            action: DealAction::SignBuyer,
            address: None,
        };
        assert_eq!(unscoped.room_key(), None);
    }

    #[test]
    fn phase_violation_maps_to_wrong_phase_code() {
        let err = SaudaError::InvalidPhase {
            phase: RoomPhase::Chat,
            operation: "submit_offer",
        };
        let event = OutboundEvent::from_error(&err, Some(RoomKey("r".into())));
        match event {
            OutboundEvent::Error { code, notice, .. } => {
                assert_eq!(code, ErrorCode::WrongPhase);
                assert!(notice.contains("submit_offer"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn closed_room_error_keeps_closure_reason_in_notice() {
        let err = SaudaError::RoomClosed {
            room_key: "room-v1-u1-1".into(),
            reason: ClosureReason::Abandoned,
        };
        let event = OutboundEvent::from_error(&err, None);
        match event {
            OutboundEvent::Error { code, notice, .. } => {
                assert_eq!(code, ErrorCode::RoomClosed);
                assert!(notice.contains("abandoned"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn outbound_closure_serializes_reason_snake_case() {
        let event = OutboundEvent::ConversationClosed {
            room_key: RoomKey("r".into()),
            closure: ClosureInfo {
                reason: ClosureReason::DealSuccess,
                closed_at: Utc::now(),
                deal_id: Some(DealId("d-1".into())),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "conversation_closed");
        assert_eq!(json["closure"]["reason"], "deal_success");
    }
}

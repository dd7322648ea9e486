// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure helpers over the room record: phase guards, closure, and the
//! per-participant snapshot. Everything that touches I/O lives in the
//! actor; this module stays synchronous so the transition rules can be
//! tested without a runtime.

use chrono::{DateTime, Utc};

use sauda_core::events::OutboundEvent;
use sauda_core::types::{
    ChatMessage, ClosureInfo, ClosureReason, DealId, ParticipantRole, RoomKey, RoomPhase,
    RoomRecord, RoomStatus, VendorId,
};
use sauda_core::SaudaError;

/// A fresh room in the greeting phase, before any party has spoken.
pub fn new_room(
    key: RoomKey,
    commodity: String,
    location: String,
    seller_id: VendorId,
    now: DateTime<Utc>,
) -> RoomRecord {
    RoomRecord {
        key,
        commodity,
        location,
        seller_id,
        buyer_name: None,
        seller_name: None,
        buyer_lang: "en".to_string(),
        seller_lang: "en".to_string(),
        phase: RoomPhase::Greeting,
        status: RoomStatus::Pending,
        market: None,
        greeting: None,
        insight: None,
        offer_too_low: None,
        current_offer: None,
        counter_offer: None,
        closure: None,
        created_at: now,
        last_activity_at: now,
    }
}

/// Rejects operations on a closed room, carrying the closure reason so
/// clients can tell "finished" apart from "never existed".
pub fn require_open(room: &RoomRecord) -> Result<(), SaudaError> {
    match &room.closure {
        Some(closure) => Err(SaudaError::RoomClosed {
            room_key: room.key.0.clone(),
            reason: closure.reason,
        }),
        None => Ok(()),
    }
}

/// Rejects an operation outside its designated phase. Closed rooms fail
/// with the closure error first.
pub fn require_phase(
    room: &RoomRecord,
    expected: RoomPhase,
    operation: &'static str,
) -> Result<(), SaudaError> {
    require_open(room)?;
    if room.phase != expected {
        return Err(SaudaError::InvalidPhase {
            phase: room.phase,
            operation,
        });
    }
    Ok(())
}

/// Moves the room to its terminal state and records why.
pub fn close(
    room: &mut RoomRecord,
    reason: ClosureReason,
    deal_id: Option<DealId>,
    now: DateTime<Utc>,
) -> ClosureInfo {
    let closure = ClosureInfo {
        reason,
        closed_at: now,
        deal_id,
    };
    room.phase = RoomPhase::Closed;
    room.status = RoomStatus::Closed;
    room.closure = Some(closure.clone());
    room.last_activity_at = now;
    closure
}

/// The full authoritative snapshot, localized for one participant.
///
/// Greeting and insight are rendered in the recipient's language;
/// messages carry their whole translation maps so the client picks its
/// side locally.
pub fn snapshot_for(
    room: &RoomRecord,
    messages: &[ChatMessage],
    role: ParticipantRole,
) -> OutboundEvent {
    OutboundEvent::RoomStateSync {
        room_key: room.key.clone(),
        phase: room.phase,
        status: room.status,
        greeting: room.greeting.as_ref().map(|g| g.text_for(role).to_string()),
        insight: room.insight.as_ref().map(|i| i.text_for(role).to_string()),
        too_low: room.offer_too_low,
        market: room.market.as_ref().map(|m| m.band),
        current_offer: room.current_offer.clone(),
        counter_offer: room.counter_offer.clone(),
        closure: room.closure.clone(),
        messages: messages.to_vec(),
    }
}

// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Sauda framework.
//!
//! These are the canonical negotiation domain types. The storage crate
//! persists them, the room state machine mutates them, and the gateway
//! serializes them onto the wire, so they live here rather than in any
//! single consumer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SaudaError;

/// Unique identifier for a negotiation room.
///
/// Callers may supply any globally unique key; keys generated on this side
/// follow the `room-{seller}-{buyer}-{millis}` convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomKey(pub String);

impl RoomKey {
    /// Derives a room key from the two party identities and a session timestamp.
    pub fn derive(seller_id: &str, buyer_id: &str, at: DateTime<Utc>) -> Self {
        RoomKey(format!(
            "room-{}-{}-{}",
            seller_id,
            buyer_id,
            at.timestamp_millis()
        ))
    }
}

/// Unique identifier for a seller (vendor) identity, used for trust scoring
/// and the per-seller notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorId(pub String);

/// Unique identifier for a deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(pub String);

impl DealId {
    /// Generates a fresh random deal id.
    pub fn new() -> Self {
        DealId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for DealId {
    fn default() -> Self {
        Self::new()
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the plugin surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Market,
    Mediator,
    Storage,
    Channel,
}

/// A participant's role inside a negotiation room.
///
/// The mediator is a full participant in the message log (greetings,
/// insights, interventions) even though it never connects over the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Buyer,
    Seller,
    Mediator,
}

impl ParticipantRole {
    /// The opposite human party. The mediator has no counterpart.
    pub fn counterpart(self) -> Option<ParticipantRole> {
        match self {
            ParticipantRole::Buyer => Some(ParticipantRole::Seller),
            ParticipantRole::Seller => Some(ParticipantRole::Buyer),
            ParticipantRole::Mediator => None,
        }
    }
}

/// The room's current stage in the negotiation state machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    Greeting,
    Offer,
    SellerReview,
    BuyerCounterReview,
    Chat,
    Closed,
}

/// Coarse lifecycle status, orthogonal to the phase.
///
/// `Pending` until the seller engages (accept/counter), `Active` through
/// free-form chat, `Closed` once a closure reason is recorded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Pending,
    Active,
    Closed,
}

/// Why a room closed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClosureReason {
    /// A deal was created out of this negotiation.
    DealSuccess,
    /// The seller rejected the opening offer.
    SellerRejected,
    /// A participant ended the negotiation manually.
    MutuallyEnded,
    /// The idle sweep closed the room after the inactivity threshold.
    Abandoned,
}

/// Closure metadata recorded when a room reaches its terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureInfo {
    pub reason: ClosureReason,
    pub closed_at: DateTime<Utc>,
    /// Set when the closure produced a deal.
    pub deal_id: Option<DealId>,
}

/// Market price band for one commodity at one location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub min_price: f64,
    pub max_price: f64,
    pub modal_price: f64,
}

/// Market state captured once per room at greeting time.
///
/// Every later evaluation in the room (offer, counter, deal fairness) is
/// judged against this snapshot, not against a fresh quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub commodity: String,
    pub location: String,
    pub band: PriceBand,
    pub captured_at: DateTime<Utc>,
}

/// A machine-readable quantity + price proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOffer {
    pub quantity: f64,
    pub unit_price: f64,
    pub purpose: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// A seller's counter to the current structured offer. Price only; the
/// quantity carries over from the offer being countered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterOffer {
    pub unit_price: f64,
    pub submitted_at: DateTime<Utc>,
}

/// Structured metadata attached to offer/counter messages in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageMeta {
    Offer { quantity: f64, unit_price: f64 },
    Counter { unit_price: f64 },
}

/// One entry in a room's append-only message log.
///
/// Immutable once appended, except for the translations map, which is
/// populated lazily: a translation for a (message, language) pair is
/// computed once and never overwritten except by an explicit preference
/// change for that language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Position in the room's log. Append order is the authoritative chat order.
    pub seq: u64,
    pub sender: ParticipantRole,
    pub sender_name: String,
    /// The text as originally spoken/typed.
    pub text: String,
    /// Language code of `text`.
    pub language: String,
    /// Cached translations keyed by recipient role.
    #[serde(default)]
    pub translations: HashMap<ParticipantRole, String>,
    pub audio_ref: Option<String>,
    pub meta: Option<MessageMeta>,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// The text a given recipient should read: their cached translation,
    /// falling back to the original.
    pub fn text_for(&self, role: ParticipantRole) -> &str {
        self.translations
            .get(&role)
            .map(String::as_str)
            .unwrap_or(&self.text)
    }
}

/// A mediator-authored string cached with per-role translations
/// (the room greeting and the latest offer insight).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LocalizedText {
    /// Text as produced by the mediation gateway (English).
    pub original: String,
    #[serde(default)]
    pub translations: HashMap<ParticipantRole, String>,
}

impl LocalizedText {
    pub fn text_for(&self, role: ParticipantRole) -> &str {
        self.translations
            .get(&role)
            .map(String::as_str)
            .unwrap_or(&self.original)
    }
}

/// One line item of a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// `quantity * unit_price`, computed server-side at deal creation.
    pub subtotal: f64,
}

/// Deal lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Draft,
    Agreed,
    Closed,
    Rejected,
    DeliveryFailed,
}

/// Actions a party can take on an existing deal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealAction {
    SignBuyer,
    SignSeller,
    Reject,
    Close,
    FailDelivery,
}

/// Terminal artifact of a successful negotiation.
///
/// A deal outlives the room that produced it and is referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub room_key: RoomKey,
    pub items: Vec<DealItem>,
    pub total: f64,
    pub buyer_signed: bool,
    pub seller_signed: bool,
    /// Recorded with the buyer's signature.
    pub delivery_address: Option<String>,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// Applies a lifecycle action, enforcing the status graph:
    /// signatures only while `draft` (both present moves the deal to
    /// `agreed`), `close` only from `agreed`, `reject` from `draft` or
    /// `agreed`, `fail_delivery` from `agreed`. Terminal statuses accept
    /// nothing.
    pub fn apply(
        &mut self,
        action: DealAction,
        address: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SaudaError> {
        match (self.status, action) {
            (DealStatus::Draft, DealAction::SignBuyer) => {
                self.buyer_signed = true;
                if address.is_some() {
                    self.delivery_address = address;
                }
            }
            (DealStatus::Draft, DealAction::SignSeller) => {
                self.seller_signed = true;
            }
            (DealStatus::Draft | DealStatus::Agreed, DealAction::Reject) => {
                self.status = DealStatus::Rejected;
            }
            (DealStatus::Agreed, DealAction::Close) => {
                self.status = DealStatus::Closed;
            }
            (DealStatus::Agreed, DealAction::FailDelivery) => {
                self.status = DealStatus::DeliveryFailed;
            }
            (status, action) => {
                return Err(SaudaError::InvalidDealTransition { status, action });
            }
        }
        if self.status == DealStatus::Draft && self.buyer_signed && self.seller_signed {
            self.status = DealStatus::Agreed;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// The three trust sub-score components.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrustComponent {
    PriceHonesty,
    NegotiationStability,
    LanguageReliability,
}

/// Confidence tier derived from how many deals back a vendor's score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Unrated,
    Bronze,
    Silver,
    Gold,
}

/// Per-vendor reputation composite.
///
/// Sub-scores stay in [0, 100] and are mutated only through the
/// incremental EMA update; `overall` is always the fixed-weight
/// combination of the three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    pub vendor_id: VendorId,
    pub price_honesty: u8,
    pub negotiation_stability: u8,
    pub language_reliability: u8,
    pub overall: u8,
    pub deal_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl TrustScore {
    /// A fresh score for a vendor with no history. All components start
    /// at the neutral default of 70.
    pub fn starting(vendor_id: VendorId, now: DateTime<Utc>) -> Self {
        TrustScore {
            vendor_id,
            price_honesty: 70,
            negotiation_stability: 70,
            language_reliability: 70,
            overall: 70,
            deal_count: 0,
            updated_at: now,
        }
    }

    pub fn component(&self, component: TrustComponent) -> u8 {
        match component {
            TrustComponent::PriceHonesty => self.price_honesty,
            TrustComponent::NegotiationStability => self.negotiation_stability,
            TrustComponent::LanguageReliability => self.language_reliability,
        }
    }

    pub fn set_component(&mut self, component: TrustComponent, value: u8) {
        match component {
            TrustComponent::PriceHonesty => self.price_honesty = value,
            TrustComponent::NegotiationStability => self.negotiation_stability = value,
            TrustComponent::LanguageReliability => self.language_reliability = value,
        }
    }

    pub fn tier(&self) -> ConfidenceTier {
        match self.deal_count {
            0..=2 => ConfidenceTier::Unrated,
            3..=9 => ConfidenceTier::Bronze,
            10..=24 => ConfidenceTier::Silver,
            _ => ConfidenceTier::Gold,
        }
    }
}

/// The persisted state of one negotiation room.
///
/// This record is the single source of truth consulted on every
/// reconnect; the message log is stored separately and ordered by `seq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub key: RoomKey,
    pub commodity: String,
    pub location: String,
    pub seller_id: VendorId,
    pub buyer_name: Option<String>,
    pub seller_name: Option<String>,
    pub buyer_lang: String,
    pub seller_lang: String,
    pub phase: RoomPhase,
    pub status: RoomStatus,
    pub market: Option<MarketSnapshot>,
    pub greeting: Option<LocalizedText>,
    /// The mediator's assessment of the latest evaluated offer/counter.
    pub insight: Option<LocalizedText>,
    /// Whether the current offer was flagged materially below market.
    pub offer_too_low: Option<bool>,
    pub current_offer: Option<StructuredOffer>,
    pub counter_offer: Option<CounterOffer>,
    pub closure: Option<ClosureInfo>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl RoomRecord {
    /// Stored language preference for a role. The mediator reads nothing.
    pub fn language_of(&self, role: ParticipantRole) -> &str {
        match role {
            ParticipantRole::Buyer => &self.buyer_lang,
            ParticipantRole::Seller => &self.seller_lang,
            ParticipantRole::Mediator => "en",
        }
    }

    pub fn display_name_of(&self, role: ParticipantRole) -> String {
        let stored = match role {
            ParticipantRole::Buyer => self.buyer_name.as_deref(),
            ParticipantRole::Seller => self.seller_name.as_deref(),
            ParticipantRole::Mediator => None,
        };
        stored.map(str::to_owned).unwrap_or_else(|| role.to_string())
    }

    pub fn is_closed(&self) -> bool {
        self.status == RoomStatus::Closed
    }
}

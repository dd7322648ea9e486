// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mediation gateway trait and its result types.
//!
//! The gateway is the abstracted AI capability behind the negotiation:
//! translation, greeting generation, offer evaluation, moderation, and
//! intervention analysis. Implementations are stateless per call. The
//! production stack layers a resilient decorator over the HTTP client so
//! a failing gateway degrades to passthrough (echoed text, safe verdict,
//! no intervention) before any error can reach a room.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SaudaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatMessage, DealItem, ParticipantRole, PriceBand, RoomPhase, StructuredOffer};

/// Verdict on a structured offer relative to the market band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferAssessment {
    pub is_too_low: bool,
    /// Mediator commentary, appended to the room log when present.
    pub insight: Option<String>,
}

/// Moderation verdict for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub reason: Option<String>,
}

impl SafetyVerdict {
    pub fn safe() -> Self {
        SafetyVerdict {
            is_safe: true,
            reason: None,
        }
    }

    pub fn flagged(reason: impl Into<String>) -> Self {
        SafetyVerdict {
            is_safe: false,
            reason: Some(reason.into()),
        }
    }
}

/// A deal suggestion the mediator extracted from the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDeal {
    pub items: Vec<DealItem>,
    pub total: f64,
}

/// Result of the mediator's intervention analysis on one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub should_intervene: bool,
    /// Message the mediator wants appended to the room, when intervening.
    pub message: Option<String>,
    pub extracted_deal: Option<ExtractedDeal>,
}

impl Intervention {
    /// The stay-silent result, also the degraded fallback.
    pub fn none() -> Self {
        Intervention {
            should_intervene: false,
            message: None,
            extracted_deal: None,
        }
    }
}

/// The abstracted translation/mediation capability.
#[async_trait]
pub trait MediatorGateway: PluginAdapter {
    /// Translates `text` between two language codes.
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, SaudaError>;

    /// Generates the one-time room greeting in the given language.
    async fn greeting(
        &self,
        commodity: &str,
        location: &str,
        band: &PriceBand,
        language: &str,
    ) -> Result<String, SaudaError>;

    /// Silently evaluates a structured offer against the market band.
    async fn evaluate_offer(
        &self,
        offer: &StructuredOffer,
        commodity: &str,
        band: &PriceBand,
    ) -> Result<OfferAssessment, SaudaError>;

    /// Full moderation pass over one message with conversation context.
    async fn check_safety(
        &self,
        text: &str,
        history: &[ChatMessage],
    ) -> Result<SafetyVerdict, SaudaError>;

    /// Intervention analysis: decides whether the mediator should speak
    /// and whether the message implies a concrete deal.
    async fn analyze(
        &self,
        sender: ParticipantRole,
        text: &str,
        commodity: &str,
        band: &PriceBand,
        history: &[ChatMessage],
        phase: RoomPhase,
    ) -> Result<Intervention, SaudaError>;
}

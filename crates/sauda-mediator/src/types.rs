// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mediation service request/response types.
//!
//! The mediation service is a private JSON-over-HTTP sidecar exposing one
//! endpoint per gateway capability under `/v1/`. These types are its wire
//! contract; domain types that already serialize cleanly (`PriceBand`,
//! `StructuredOffer`, `ExtractedDeal`) are embedded as-is.

use serde::{Deserialize, Serialize};

use sauda_core::traits::mediator::ExtractedDeal;
use sauda_core::types::{ChatMessage, ParticipantRole, PriceBand, RoomPhase, StructuredOffer};

/// One prior message, compacted for the service.
///
/// The service only needs who spoke, what they said, and in which
/// language; per-role translations stay on this side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sender: ParticipantRole,
    pub text: String,
    pub language: String,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            sender: message.sender,
            text: message.text.clone(),
            language: message.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslateRequest<'a> {
    pub text: &'a str,
    pub from: &'a str,
    pub to: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateResponse {
    pub translated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GreetingRequest<'a> {
    pub commodity: &'a str,
    pub location: &'a str,
    pub band: &'a PriceBand,
    pub language: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GreetingResponse {
    pub greeting: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateOfferRequest<'a> {
    pub offer: &'a StructuredOffer,
    pub commodity: &'a str,
    pub band: &'a PriceBand,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateOfferResponse {
    pub is_too_low: bool,
    #[serde(default)]
    pub insight: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckSafetyRequest<'a> {
    pub text: &'a str,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSafetyResponse {
    pub is_safe: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub sender: ParticipantRole,
    pub text: &'a str,
    pub commodity: &'a str,
    pub band: &'a PriceBand,
    pub history: Vec<HistoryEntry>,
    pub phase: RoomPhase,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub should_intervene: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub extracted_deal: Option<ExtractedDeal>,
}

/// Error body returned by the mediation service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_response_defaults_optional_fields() {
        let parsed: AnalyzeResponse =
            serde_json::from_str(r#"{"should_intervene": false}"#).unwrap();
        assert!(!parsed.should_intervene);
        assert!(parsed.message.is_none());
        assert!(parsed.extracted_deal.is_none());
    }

    #[test]
    fn analyze_response_parses_extracted_deal() {
        let body = r#"{
            "should_intervene": true,
            "message": "You are close to agreement.",
            "extracted_deal": {
                "items": [{"name": "Wheat", "quantity": 10.0, "unit_price": 2150.0, "subtotal": 21500.0}],
                "total": 21500.0
            }
        }"#;
        let parsed: AnalyzeResponse = serde_json::from_str(body).unwrap();
        let deal = parsed.extracted_deal.unwrap();
        assert_eq!(deal.items.len(), 1);
        assert_eq!(deal.total, 21500.0);
    }

    #[test]
    fn history_entry_compacts_chat_message() {
        use chrono::Utc;
        use std::collections::HashMap;

        let mut translations = HashMap::new();
        translations.insert(ParticipantRole::Seller, "வணக்கம்".to_string());
        let message = ChatMessage {
            seq: 4,
            sender: ParticipantRole::Buyer,
            sender_name: "Ravi".to_string(),
            text: "नमस्ते".to_string(),
            language: "hi".to_string(),
            translations,
            audio_ref: None,
            meta: None,
            sent_at: Utc::now(),
        };

        let entry = HistoryEntry::from(&message);
        assert_eq!(entry.sender, ParticipantRole::Buyer);
        assert_eq!(entry.text, "नमस्ते");
        assert_eq!(entry.language, "hi");
    }
}

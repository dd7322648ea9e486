// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Word-list and trigger policies applied to room traffic.
//!
//! Two moderation tiers run before a message is appended: the local deny
//! list here rejects outright in every phase, and the gateway's
//! moderation pass additionally covers the structured pre-chat phases.
//! The trigger predicates decide when a message is worth a gateway call
//! for intervention analysis at all; most chat never is.

use sauda_config::model::NegotiationConfig;
use sauda_core::types::{ChatMessage, ParticipantRole, PriceBand, RoomPhase};

/// Compiled word lists and thresholds from [`NegotiationConfig`].
///
/// All lists are lowercased once at construction; matching is
/// case-insensitive substring containment.
pub struct NegotiationPolicy {
    banned_words: Vec<String>,
    dispute_keywords: Vec<String>,
    deal_dispute_keywords: Vec<String>,
    deal_signal_words: Vec<String>,
    aggression_words: Vec<String>,
    too_low_ratio: f64,
}

impl NegotiationPolicy {
    pub fn new(config: &NegotiationConfig) -> Self {
        Self {
            banned_words: lowered(&config.banned_words),
            dispute_keywords: lowered(&config.dispute_keywords),
            deal_dispute_keywords: lowered(&config.deal_dispute_keywords),
            deal_signal_words: lowered(&config.deal_signal_words),
            aggression_words: lowered(&config.aggression_words),
            too_low_ratio: config.too_low_ratio,
        }
    }

    /// First deny-listed word contained in `text`, if any.
    pub fn banned_word_in(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.banned_words
            .iter()
            .find(|word| text.contains(word.as_str()))
            .map(String::as_str)
    }

    /// Whether a live message reads as a translation/honesty dispute.
    pub fn mentions_dispute(&self, text: &str) -> bool {
        contains_any(&self.dispute_keywords, text)
    }

    /// Number of participant messages containing dispute vocabulary.
    ///
    /// Counted over the whole conversation when a deal closes; mediator
    /// messages never count against the vendor.
    pub fn deal_dispute_count(&self, messages: &[ChatMessage]) -> u32 {
        messages
            .iter()
            .filter(|m| m.sender != ParticipantRole::Mediator)
            .filter(|m| contains_any(&self.deal_dispute_keywords, &m.text))
            .count() as u32
    }

    /// Whether the text signals a party is trying to close a deal.
    pub fn signals_deal(&self, text: &str) -> bool {
        contains_any(&self.deal_signal_words, text)
    }

    /// Whether the text carries an aggressive tone marker.
    pub fn sounds_aggressive(&self, text: &str) -> bool {
        contains_any(&self.aggression_words, text)
    }

    /// Any numeric token counts as a price mention.
    pub fn mentions_price(&self, text: &str) -> bool {
        text.chars().any(|c| c.is_ascii_digit())
    }

    /// Whether the message restates the most recent price a participant
    /// quoted, i.e. the party is holding their position.
    pub fn repeats_last_price(&self, text: &str, history: &[ChatMessage]) -> bool {
        let Some(current) = price_tokens(text).last().copied() else {
            return false;
        };
        for earlier in history.iter().rev() {
            if earlier.sender == ParticipantRole::Mediator {
                continue;
            }
            if let Some(prior) = price_tokens(&earlier.text).last() {
                return (current - prior).abs() < f64::EPSILON;
            }
        }
        false
    }

    /// An offer is flagged when its unit price falls below the configured
    /// fraction of the market minimum.
    pub fn offer_below_floor(&self, unit_price: f64, band: &PriceBand) -> bool {
        unit_price < band.min_price * self.too_low_ratio
    }

    /// Whether a chat message warrants the mediator's intervention
    /// analysis.
    ///
    /// Inside free-form chat only an explicit deal signal triggers the
    /// gateway call; in the structured phases price talk, aggression, and
    /// a restated price trigger it too.
    pub fn should_consult_mediator(
        &self,
        text: &str,
        history: &[ChatMessage],
        phase: RoomPhase,
    ) -> bool {
        if phase == RoomPhase::Chat {
            return self.signals_deal(text);
        }
        self.signals_deal(text)
            || self.mentions_price(text)
            || self.sounds_aggressive(text)
            || self.repeats_last_price(text, history)
    }
}

fn lowered(words: &[String]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

fn contains_any(words: &[String], text: &str) -> bool {
    let text = text.to_lowercase();
    words.iter().any(|word| text.contains(word.as_str()))
}

/// Numeric tokens in the text: digit runs with at most one decimal point.
fn price_tokens(text: &str) -> Vec<f64> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() || (c == '.' && !current.is_empty() && !current.contains('.')) {
            current.push(c);
        } else {
            flush_token(&mut current, &mut tokens);
        }
    }
    flush_token(&mut current, &mut tokens);
    tokens
}

fn flush_token(current: &mut String, tokens: &mut Vec<f64>) {
    if current.is_empty() {
        return;
    }
    if let Ok(value) = current.trim_end_matches('.').parse::<f64>() {
        tokens.push(value);
    }
    current.clear();
}

// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Degrading wrapper around any mediation gateway.
//!
//! A negotiation must survive the mediation service being down. This
//! wrapper absorbs every inner failure and substitutes a passthrough:
//! untranslated text, a template greeting, a neutral offer assessment,
//! a safe verdict, and no intervention. The word-list checks that run
//! locally in the room are unaffected, so the hard moderation floor
//! holds even while degraded.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use sauda_core::traits::adapter::PluginAdapter;
use sauda_core::traits::mediator::{
    Intervention, MediatorGateway, OfferAssessment, SafetyVerdict,
};
use sauda_core::types::{
    AdapterType, ChatMessage, HealthStatus, ParticipantRole, PriceBand, RoomPhase,
    StructuredOffer,
};
use sauda_core::SaudaError;

/// A [`MediatorGateway`] that never fails.
pub struct ResilientMediator {
    inner: Arc<dyn MediatorGateway>,
}

impl ResilientMediator {
    pub fn new(inner: Arc<dyn MediatorGateway>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl PluginAdapter for ResilientMediator {
    fn name(&self) -> &str {
        "resilient-mediator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mediator
    }

    async fn health_check(&self) -> Result<HealthStatus, SaudaError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), SaudaError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl MediatorGateway for ResilientMediator {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, SaudaError> {
        match self.inner.translate(text, from, to).await {
            Ok(translated) => Ok(translated),
            Err(err) => {
                warn!(error = %err, from, to, "translation failed, passing text through");
                Ok(text.to_string())
            }
        }
    }

    async fn greeting(
        &self,
        commodity: &str,
        location: &str,
        band: &PriceBand,
        language: &str,
    ) -> Result<String, SaudaError> {
        match self.inner.greeting(commodity, location, band, language).await {
            Ok(greeting) => Ok(greeting),
            Err(err) => {
                warn!(error = %err, language, "greeting generation failed, using template");
                Ok(format!(
                    "Namaste! Today's market rate for {commodity} in {location} is around \
                     \u{20b9}{:.0} per quintal (\u{20b9}{:.0} to \u{20b9}{:.0}). \
                     Let's negotiate a fair deal.",
                    band.modal_price, band.min_price, band.max_price
                ))
            }
        }
    }

    async fn evaluate_offer(
        &self,
        offer: &StructuredOffer,
        commodity: &str,
        band: &PriceBand,
    ) -> Result<OfferAssessment, SaudaError> {
        match self.inner.evaluate_offer(offer, commodity, band).await {
            Ok(assessment) => Ok(assessment),
            Err(err) => {
                warn!(error = %err, "offer evaluation failed, returning neutral assessment");
                Ok(OfferAssessment {
                    is_too_low: false,
                    insight: None,
                })
            }
        }
    }

    async fn check_safety(
        &self,
        text: &str,
        history: &[ChatMessage],
    ) -> Result<SafetyVerdict, SaudaError> {
        match self.inner.check_safety(text, history).await {
            Ok(verdict) => Ok(verdict),
            Err(err) => {
                warn!(error = %err, "safety check failed, failing open to word-list only");
                Ok(SafetyVerdict::safe())
            }
        }
    }

    async fn analyze(
        &self,
        sender: ParticipantRole,
        text: &str,
        commodity: &str,
        band: &PriceBand,
        history: &[ChatMessage],
        phase: RoomPhase,
    ) -> Result<Intervention, SaudaError> {
        match self
            .inner
            .analyze(sender, text, commodity, band, history, phase)
            .await
        {
            Ok(intervention) => Ok(intervention),
            Err(err) => {
                warn!(error = %err, "intervention analysis failed, staying silent");
                Ok(Intervention::none())
            }
        }
    }
}

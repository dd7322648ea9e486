// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP mediation gateway adapter.
//!
//! Implements [`MediatorGateway`] against the private mediation service,
//! which performs translation, greeting generation, offer evaluation,
//! moderation, and intervention analysis.
//!
//! [`HttpMediator`] is the raw adapter; every call can fail on transport.
//! Production wiring wraps it in [`ResilientMediator`], which degrades each
//! capability to a passthrough so a sick service slows a negotiation down
//! rather than killing it.

pub mod client;
pub mod resilient;
pub mod types;

use async_trait::async_trait;

use sauda_config::model::MediatorConfig;
use sauda_core::traits::adapter::PluginAdapter;
use sauda_core::traits::mediator::{
    Intervention, MediatorGateway, OfferAssessment, SafetyVerdict,
};
use sauda_core::types::{
    AdapterType, ChatMessage, HealthStatus, ParticipantRole, PriceBand, RoomPhase,
    StructuredOffer,
};
use sauda_core::SaudaError;

use crate::client::MediatorClient;
use crate::types::{
    AnalyzeRequest, CheckSafetyRequest, EvaluateOfferRequest, GreetingRequest, HistoryEntry,
    TranslateRequest,
};

pub use resilient::ResilientMediator;

/// Mediation gateway backed by the HTTP mediation service.
pub struct HttpMediator {
    client: MediatorClient,
}

impl HttpMediator {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, SaudaError> {
        Ok(Self {
            client: MediatorClient::new(base_url, api_key, timeout_secs)?,
        })
    }

    pub fn from_config(config: &MediatorConfig) -> Result<Self, SaudaError> {
        Self::new(
            &config.base_url,
            config.api_key.as_deref(),
            config.timeout_secs,
        )
    }

    fn history_entries(history: &[ChatMessage]) -> Vec<HistoryEntry> {
        history.iter().map(HistoryEntry::from).collect()
    }
}

#[async_trait]
impl PluginAdapter for HttpMediator {
    fn name(&self) -> &str {
        "http-mediator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mediator
    }

    async fn health_check(&self) -> Result<HealthStatus, SaudaError> {
        match self.client.ping_health().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(err) => Ok(HealthStatus::Unhealthy(err.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), SaudaError> {
        tracing::debug!("HTTP mediator shutting down");
        Ok(())
    }
}

#[async_trait]
impl MediatorGateway for HttpMediator {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, SaudaError> {
        let response = self
            .client
            .translate(&TranslateRequest { text, from, to })
            .await?;
        Ok(response.translated)
    }

    async fn greeting(
        &self,
        commodity: &str,
        location: &str,
        band: &PriceBand,
        language: &str,
    ) -> Result<String, SaudaError> {
        let response = self
            .client
            .greeting(&GreetingRequest {
                commodity,
                location,
                band,
                language,
            })
            .await?;
        Ok(response.greeting)
    }

    async fn evaluate_offer(
        &self,
        offer: &StructuredOffer,
        commodity: &str,
        band: &PriceBand,
    ) -> Result<OfferAssessment, SaudaError> {
        let response = self
            .client
            .evaluate_offer(&EvaluateOfferRequest {
                offer,
                commodity,
                band,
            })
            .await?;
        Ok(OfferAssessment {
            is_too_low: response.is_too_low,
            insight: response.insight,
        })
    }

    async fn check_safety(
        &self,
        text: &str,
        history: &[ChatMessage],
    ) -> Result<SafetyVerdict, SaudaError> {
        let response = self
            .client
            .check_safety(&CheckSafetyRequest {
                text,
                history: Self::history_entries(history),
            })
            .await?;
        Ok(SafetyVerdict {
            is_safe: response.is_safe,
            reason: response.reason,
        })
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
        let response = self
            .client
            .analyze(&AnalyzeRequest {
                sender,
                text,
                commodity,
                band,
                history: Self::history_entries(history),
                phase,
            })
            .await?;
        Ok(Intervention {
            should_intervene: response.should_intervene,
            message: response.message,
            extracted_deal: response.extracted_deal,
        })
    }
}

// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock mediation gateway for deterministic testing.
//!
//! `MockMediator` implements `MediatorGateway` with pre-configured verdicts,
//! enabling fast, CI-runnable tests without a translation service.
//!
//! Translations are deterministic markers of the form `[{to}] {text}` so
//! tests can assert exactly which target language a broadcast was rendered
//! in. Greeting texts, offer assessments, safety verdicts, and intervention
//! results are popped from per-method FIFO queues; empty queues fall back
//! to benign defaults (safe, no intervention, offer in band).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sauda_core::traits::adapter::PluginAdapter;
use sauda_core::traits::mediator::{
    Intervention, MediatorGateway, OfferAssessment, SafetyVerdict,
};
use sauda_core::types::{
    AdapterType, ChatMessage, HealthStatus, ParticipantRole, PriceBand, RoomPhase,
    StructuredOffer,
};
use sauda_core::SaudaError;

/// Captured arguments from one `analyze()` call.
#[derive(Debug, Clone)]
pub struct AnalyzeCall {
    pub sender: ParticipantRole,
    pub text: String,
    pub history_len: usize,
    pub phase: RoomPhase,
}

/// A mock mediation gateway that returns pre-configured verdicts.
pub struct MockMediator {
    greetings: Arc<Mutex<VecDeque<String>>>,
    assessments: Arc<Mutex<VecDeque<OfferAssessment>>>,
    verdicts: Arc<Mutex<VecDeque<SafetyVerdict>>>,
    interventions: Arc<Mutex<VecDeque<Intervention>>>,
    analyze_calls: Arc<Mutex<Vec<AnalyzeCall>>>,
    failing: Arc<AtomicBool>,
}

impl MockMediator {
    /// Create a mock mediator with empty queues and benign defaults.
    pub fn new() -> Self {
        Self {
            greetings: Arc::new(Mutex::new(VecDeque::new())),
            assessments: Arc::new(Mutex::new(VecDeque::new())),
            verdicts: Arc::new(Mutex::new(VecDeque::new())),
            interventions: Arc::new(Mutex::new(VecDeque::new())),
            analyze_calls: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue a greeting text for the next `greeting()` call.
    pub async fn push_greeting(&self, text: impl Into<String>) {
        self.greetings.lock().await.push_back(text.into());
    }

    /// Queue an assessment for the next `evaluate_offer()` call.
    pub async fn push_assessment(&self, assessment: OfferAssessment) {
        self.assessments.lock().await.push_back(assessment);
    }

    /// Queue a safety verdict for the next `check_safety()` call.
    pub async fn push_verdict(&self, verdict: SafetyVerdict) {
        self.verdicts.lock().await.push_back(verdict);
    }

    /// Queue an intervention result for the next `analyze()` call.
    pub async fn push_intervention(&self, intervention: Intervention) {
        self.interventions.lock().await.push_back(intervention);
    }

    /// When set, every gateway method returns a `SaudaError::Mediator`.
    /// Used to exercise degraded-passthrough behavior.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All `analyze()` calls captured so far.
    pub async fn analyze_calls(&self) -> Vec<AnalyzeCall> {
        self.analyze_calls.lock().await.clone()
    }

    fn fail_if_configured(&self, method: &str) -> Result<(), SaudaError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SaudaError::Mediator {
                message: format!("mock mediator configured to fail: {method}"),
                source: None,
            })
        } else {
            Ok(())
        }
    }
}

impl Default for MockMediator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockMediator {
    fn name(&self) -> &str {
        "mock-mediator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mediator
    }

    async fn health_check(&self) -> Result<HealthStatus, SaudaError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("configured to fail".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), SaudaError> {
        Ok(())
    }
}

#[async_trait]
impl MediatorGateway for MockMediator {
    async fn translate(&self, text: &str, _from: &str, to: &str) -> Result<String, SaudaError> {
        self.fail_if_configured("translate")?;
        Ok(format!("[{to}] {text}"))
    }

    async fn greeting(
        &self,
        commodity: &str,
        _location: &str,
        _band: &PriceBand,
        language: &str,
    ) -> Result<String, SaudaError> {
        self.fail_if_configured("greeting")?;
        Ok(self
            .greetings
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| format!("[{language}] mock greeting for {commodity}")))
    }

    async fn evaluate_offer(
        &self,
        _offer: &StructuredOffer,
        _commodity: &str,
        _band: &PriceBand,
    ) -> Result<OfferAssessment, SaudaError> {
        self.fail_if_configured("evaluate_offer")?;
        Ok(self
            .assessments
            .lock()
            .await
            .pop_front()
            .unwrap_or(OfferAssessment {
                is_too_low: false,
                insight: None,
            }))
    }

    async fn check_safety(
        &self,
        _text: &str,
        _history: &[ChatMessage],
    ) -> Result<SafetyVerdict, SaudaError> {
        self.fail_if_configured("check_safety")?;
        Ok(self
            .verdicts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(SafetyVerdict::safe))
    }

    async fn analyze(
        &self,
        sender: ParticipantRole,
        text: &str,
        _commodity: &str,
        _band: &PriceBand,
        history: &[ChatMessage],
        phase: RoomPhase,
    ) -> Result<Intervention, SaudaError> {
        self.fail_if_configured("analyze")?;
        self.analyze_calls.lock().await.push(AnalyzeCall {
            sender,
            text: text.to_string(),
            history_len: history.len(),
            phase,
        });
        Ok(self
            .interventions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(Intervention::none))
    }
}

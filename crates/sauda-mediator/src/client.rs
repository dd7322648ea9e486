// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the mediation service.
//!
//! Provides [`MediatorClient`] which handles request construction,
//! authentication, and transient error retry for every `/v1/` endpoint.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use sauda_core::SaudaError;

use crate::types::{
    AnalyzeRequest, AnalyzeResponse, ApiErrorResponse, CheckSafetyRequest, CheckSafetyResponse,
    EvaluateOfferRequest, EvaluateOfferResponse, GreetingRequest, GreetingResponse,
    TranslateRequest, TranslateResponse,
};

/// Pause before the single retry of a transient failure.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP client for mediation service communication.
///
/// Holds the pooled reqwest client plus auth headers, and retries
/// transient failures (429, 500, 503) once before giving up.
#[derive(Debug, Clone)]
pub struct MediatorClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

/// One HTTP round trip, classified for the retry loop.
enum Sent<R> {
    Parsed(R),
    Retryable { status: reqwest::StatusCode, body: String },
    Refused { status: reqwest::StatusCode, body: String },
}

impl MediatorClient {
    /// Builds a client for the service at `base_url`, with a per-request
    /// timeout and `Bearer` auth when an API key is configured.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, SaudaError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| SaudaError::Config(format!("invalid API key header value: {e}")))?;
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SaudaError::Mediator {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    /// Points the client at a wiremock server in tests.
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub async fn translate(
        &self,
        request: &TranslateRequest<'_>,
    ) -> Result<TranslateResponse, SaudaError> {
        self.post("/v1/translate", request).await
    }

    pub async fn greeting(
        &self,
        request: &GreetingRequest<'_>,
    ) -> Result<GreetingResponse, SaudaError> {
        self.post("/v1/greeting", request).await
    }

    pub async fn evaluate_offer(
        &self,
        request: &EvaluateOfferRequest<'_>,
    ) -> Result<EvaluateOfferResponse, SaudaError> {
        self.post("/v1/evaluate-offer", request).await
    }

    pub async fn check_safety(
        &self,
        request: &CheckSafetyRequest<'_>,
    ) -> Result<CheckSafetyResponse, SaudaError> {
        self.post("/v1/check-safety", request).await
    }

    pub async fn analyze(
        &self,
        request: &AnalyzeRequest<'_>,
    ) -> Result<AnalyzeResponse, SaudaError> {
        self.post("/v1/analyze", request).await
    }

    /// Lightweight liveness probe against the service `/health` endpoint.
    pub async fn ping_health(&self) -> Result<(), SaudaError> {
        let url = format!("{}/health", self.base_url);
        let status = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SaudaError::Mediator {
                message: format!("health probe failed: {e}"),
                source: Some(Box::new(e)),
            })?
            .status();

        if status.is_success() {
            Ok(())
        } else {
            Err(SaudaError::Mediator {
                message: format!("health probe returned {status}"),
                source: None,
            })
        }
    }

    /// POSTs `body` as JSON and decodes the reply, giving transient
    /// statuses one more chance after [`RETRY_DELAY`].
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, SaudaError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let mut attempt = 0;
        loop {
            match self.send_once(&url, body).await? {
                Sent::Parsed(value) => return Ok(value),
                Sent::Retryable { status, body } if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(%status, body = %body, attempt, path, "transient mediation error, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Sent::Retryable { status, body } => {
                    return Err(SaudaError::Mediator {
                        message: format!("service returned {status}: {body}"),
                        source: None,
                    });
                }
                Sent::Refused { status, body } => {
                    return Err(SaudaError::Mediator {
                        message: refusal_message(status, &body),
                        source: None,
                    });
                }
            }
        }
    }

    async fn send_once<B, R>(&self, url: &str, body: &B) -> Result<Sent<R>, SaudaError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SaudaError::Mediator {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| SaudaError::Mediator {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(%status, "mediation response received");

        if status.is_success() {
            let parsed = serde_json::from_str(&text).map_err(|e| SaudaError::Mediator {
                message: format!("undecodable service response: {e}"),
                source: Some(Box::new(e)),
            })?;
            return Ok(Sent::Parsed(parsed));
        }

        if is_transient(status) {
            Ok(Sent::Retryable { status, body: text })
        } else {
            Ok(Sent::Refused { status, body: text })
        }
    }
}

/// Formats a refusal, preferring the service's structured error body.
fn refusal_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!(
            "mediation service error ({}): {}",
            api_err.error.type_, api_err.error.message
        ),
        Err(_) => format!("service returned {status}: {body}"),
    }
}

/// Statuses the service emits for overload or hiccups, worth one retry.
fn is_transient(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sauda_core::types::PriceBand;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> MediatorClient {
        MediatorClient::new("http://unused.invalid", Some("test-key"), 5)
            .unwrap()
            .with_base_url(base_url.to_string())
    }

    fn band() -> PriceBand {
        PriceBand {
            min_price: 2100.0,
            max_price: 2300.0,
            modal_price: 2200.0,
        }
    }

    #[tokio::test]
    async fn translate_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/translate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"translated": "नमस्ते"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client
            .translate(&TranslateRequest {
                text: "hello",
                from: "en",
                to: "hi",
            })
            .await
            .unwrap();

        assert_eq!(result.translated, "नमस्ते");
    }

    #[tokio::test]
    async fn retries_once_on_429() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/greeting"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/greeting"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"greeting": "Namaste!"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client
            .greeting(&GreetingRequest {
                commodity: "Wheat",
                location: "Karnal",
                band: &band(),
                language: "hi",
            })
            .await
            .unwrap();

        assert_eq!(result.greeting, "Namaste!");
    }

    #[tokio::test]
    async fn surfaces_service_error_type_on_400() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/translate"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "unknown_language", "message": "no such language code"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .translate(&TranslateRequest {
                text: "hello",
                from: "en",
                to: "xx",
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unknown_language"), "got: {err}");
    }

    #[tokio::test]
    async fn exhausts_retries_on_503() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/check-safety"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client
            .check_safety(&CheckSafetyRequest {
                text: "hello",
                history: vec![],
            })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn sends_bearer_authorization_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/translate"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"translated": "ok"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client
            .translate(&TranslateRequest {
                text: "x",
                from: "en",
                to: "hi",
            })
            .await;

        assert!(result.is_ok(), "headers should match: {result:?}");
    }

    #[tokio::test]
    async fn health_probe_maps_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client.ping_health().await.is_ok());
    }
}

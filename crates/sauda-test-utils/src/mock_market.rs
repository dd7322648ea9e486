// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock market data source with a fixed price band.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sauda_core::traits::adapter::PluginAdapter;
use sauda_core::traits::market::MarketDataSource;
use sauda_core::types::{AdapterType, HealthStatus, PriceBand};
use sauda_core::SaudaError;

/// A market source that always returns the same band and records queries.
pub struct MockMarket {
    band: PriceBand,
    queries: Arc<Mutex<Vec<(String, String)>>>,
    failing: Arc<AtomicBool>,
}

impl MockMarket {
    /// Create a mock market with the demo wheat band (2100/2300/2200).
    pub fn new() -> Self {
        Self::with_band(PriceBand {
            min_price: 2100.0,
            max_price: 2300.0,
            modal_price: 2200.0,
        })
    }

    /// Create a mock market that returns the given band for every query.
    pub fn with_band(band: PriceBand) -> Self {
        Self {
            band,
            queries: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// When set, `current_price` returns a `SaudaError::Market`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All `(commodity, location)` pairs queried so far.
    pub async fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().await.clone()
    }

    /// Number of price lookups performed.
    pub async fn query_count(&self) -> usize {
        self.queries.lock().await.len()
    }
}

impl Default for MockMarket {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockMarket {
    fn name(&self) -> &str {
        "mock-market"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Market
    }

    async fn health_check(&self) -> Result<HealthStatus, SaudaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SaudaError> {
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for MockMarket {
    async fn current_price(
        &self,
        commodity: &str,
        location: &str,
    ) -> Result<PriceBand, SaudaError> {
        self.queries
            .lock()
            .await
            .push((commodity.to_string(), location.to_string()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(SaudaError::Market {
                message: "mock market configured to fail".to_string(),
                source: None,
            });
        }
        Ok(self.band)
    }
}

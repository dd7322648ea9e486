// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiled-in market band table for demo deployments.
//!
//! Prices are rupees per quintal, calibrated to north-Indian mandi rates.
//! A real deployment would put an agmarknet-backed source behind the same
//! trait; rooms only ever see the `MarketDataSource` surface.

use async_trait::async_trait;

use sauda_core::traits::adapter::PluginAdapter;
use sauda_core::traits::market::MarketDataSource;
use sauda_core::types::{AdapterType, HealthStatus, PriceBand};
use sauda_core::SaudaError;

/// `(commodity, min, max, modal)` in rupees per quintal.
const BAND_TABLE: &[(&str, f64, f64, f64)] = &[
    ("wheat", 2100.0, 2300.0, 2200.0),
    ("rice", 3300.0, 3700.0, 3500.0),
    ("tomato", 1400.0, 1650.0, 1500.0),
    ("onion", 1100.0, 1350.0, 1200.0),
    ("potato", 900.0, 1150.0, 1000.0),
];

/// Fallback band for commodities missing from the table, so a room can
/// always be opened.
const DEFAULT_BAND: PriceBand = PriceBand {
    min_price: 2100.0,
    max_price: 2300.0,
    modal_price: 2200.0,
};

/// A market source backed by the compiled-in band table.
///
/// Lookup is case-insensitive on the commodity name. The location is
/// accepted for interface compatibility; the demo table is national.
#[derive(Debug, Default)]
pub struct StaticMarketSource;

impl StaticMarketSource {
    pub fn new() -> Self {
        StaticMarketSource
    }
}

#[async_trait]
impl PluginAdapter for StaticMarketSource {
    fn name(&self) -> &str {
        "static-market"
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
impl MarketDataSource for StaticMarketSource {
    async fn current_price(
        &self,
        commodity: &str,
        location: &str,
    ) -> Result<PriceBand, SaudaError> {
        let band = BAND_TABLE
            .iter()
            .find(|(name, _, _, _)| name.eq_ignore_ascii_case(commodity.trim()))
            .map(|&(_, min, max, modal)| PriceBand {
                min_price: min,
                max_price: max,
                modal_price: modal,
            })
            .unwrap_or_else(|| {
                tracing::debug!(commodity, location, "commodity not in band table, using default");
                DEFAULT_BAND
            });
        Ok(band)
    }
}

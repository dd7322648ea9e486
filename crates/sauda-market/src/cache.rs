// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL cache in front of a market data source.
//!
//! Rooms fetch a band once per negotiation, but several rooms for the same
//! commodity and mandi open within minutes of each other. The cache keeps
//! repeated greetings from hammering the upstream source. On a refresh
//! failure an expired entry is served rather than failing the room open.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use sauda_core::traits::adapter::PluginAdapter;
use sauda_core::traits::market::MarketDataSource;
use sauda_core::types::{AdapterType, HealthStatus, PriceBand};
use sauda_core::{Clock, SaudaError};

struct CacheEntry {
    band: PriceBand,
    fetched_at: DateTime<Utc>,
}

/// A caching wrapper around any [`MarketDataSource`].
///
/// Entries are keyed by `(commodity, location)` lowercased. Expiry is
/// judged against the injected [`Clock`] so tests control time.
pub struct CachedMarket {
    inner: Arc<dyn MarketDataSource>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<(String, String), CacheEntry>>,
}

impl CachedMarket {
    pub fn new(inner: Arc<dyn MarketDataSource>, ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            ttl: Duration::seconds(ttl_secs as i64),
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PluginAdapter for CachedMarket {
    fn name(&self) -> &str {
        "cached-market"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Market
    }

    async fn health_check(&self) -> Result<HealthStatus, SaudaError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), SaudaError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl MarketDataSource for CachedMarket {
    async fn current_price(
        &self,
        commodity: &str,
        location: &str,
    ) -> Result<PriceBand, SaudaError> {
        let key = (commodity.to_lowercase(), location.to_lowercase());
        let now = self.clock.now();

        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(&key)
            && now - entry.fetched_at < self.ttl
        {
            tracing::trace!(commodity, location, "market band served from cache");
            return Ok(entry.band);
        }

        match self.inner.current_price(commodity, location).await {
            Ok(band) => {
                entries.insert(
                    key,
                    CacheEntry {
                        band,
                        fetched_at: now,
                    },
                );
                Ok(band)
            }
            Err(err) => {
                // Expired entry beats no band at all.
                if let Some(entry) = entries.get(&key) {
                    tracing::warn!(
                        commodity,
                        location,
                        error = %err,
                        "market refresh failed, serving expired band"
                    );
                    return Ok(entry.band);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sauda_test_utils::{ManualClock, MockMarket};

    fn setup(ttl_secs: u64) -> (Arc<MockMarket>, Arc<ManualClock>, CachedMarket) {
        let inner = Arc::new(MockMarket::new());
        let clock = Arc::new(ManualClock::new());
        let cache = CachedMarket::new(inner.clone(), ttl_secs, clock.clone());
        (inner, clock, cache)
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_hits_cache() {
        let (inner, _clock, cache) = setup(300);

        cache.current_price("Wheat", "Karnal").await.unwrap();
        cache.current_price("Wheat", "Karnal").await.unwrap();

        assert_eq!(inner.query_count().await, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let (inner, clock, cache) = setup(300);

        cache.current_price("Wheat", "Karnal").await.unwrap();
        clock.advance(Duration::seconds(301));
        cache.current_price("Wheat", "Karnal").await.unwrap();

        assert_eq!(inner.query_count().await, 2);
    }

    #[tokio::test]
    async fn distinct_locations_are_cached_separately() {
        let (inner, _clock, cache) = setup(300);

        cache.current_price("Wheat", "Karnal").await.unwrap();
        cache.current_price("Wheat", "Ludhiana").await.unwrap();

        assert_eq!(inner.query_count().await, 2);
    }

    #[tokio::test]
    async fn refresh_failure_serves_expired_band() {
        let (inner, clock, cache) = setup(300);

        let first = cache.current_price("Wheat", "Karnal").await.unwrap();
        clock.advance(Duration::seconds(301));
        inner.set_failing(true);

        let served = cache.current_price("Wheat", "Karnal").await.unwrap();
        assert_eq!(served, first);
        assert_eq!(inner.query_count().await, 2);
    }

    #[tokio::test]
    async fn failure_with_empty_cache_propagates() {
        let (inner, _clock, cache) = setup(300);
        inner.set_failing(true);
        assert!(cache.current_price("Wheat", "Karnal").await.is_err());
    }
}
